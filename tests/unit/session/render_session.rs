use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Fps;
use crate::render::canvas::FaceWeight;
use crate::render::pipeline::FrameErrorPolicy;
use crate::render::scene::{DrawOp, FrameScene};
use crate::transcript::mapper::TranscriptEntry;

struct Mono;

impl TextMeasure for Mono {
    fn measure_width(&mut self, text: &str, _weight: FaceWeight) -> CapsyncResult<f64> {
        Ok(text.chars().count() as f64 * 12.0)
    }
}

/// Encodes the bold word instead of pixels; fails on "boom".
struct BoldWordCanvas;

impl TextMeasure for BoldWordCanvas {
    fn measure_width(&mut self, text: &str, weight: FaceWeight) -> CapsyncResult<f64> {
        Mono.measure_width(text, weight)
    }
}

impl Canvas for BoldWordCanvas {
    fn draw_frame(&mut self, scene: &FrameScene) -> CapsyncResult<Vec<u8>> {
        let bold = scene.ops.iter().find_map(|op| match op {
            DrawOp::Text {
                text,
                weight: FaceWeight::Bold,
                ..
            } => Some(text.as_str()),
            _ => None,
        });
        match bold {
            Some("boom") => Err(CapsyncError::validation("boom")),
            Some(t) => Ok(t.as_bytes().to_vec()),
            None => Ok(Vec::new()),
        }
    }
}

/// Rejects every frame after the first few.
#[derive(Default)]
struct FailingSink {
    pushed: u64,
    ended: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> CapsyncResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, _image: &[u8]) -> CapsyncResult<()> {
        if self.pushed == 3 {
            return Err(CapsyncError::composition("disk full"));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> CapsyncResult<()> {
        self.ended = true;
        Ok(())
    }
}

fn session(words: &[&str], fps: u32) -> CaptionSession {
    let entries = words
        .iter()
        .enumerate()
        .map(|(i, w)| TranscriptEntry {
            word: (*w).to_owned(),
            time: i as f64 * 0.5,
            duration: 0.4,
        })
        .collect();
    let transcript = Transcript::from_entries(entries, Fps::integer(fps).unwrap()).unwrap();
    let opts = RenderOptions {
        width: 360,
        height: 640,
        padding: 10.0,
        max_lines: 2,
        fps,
        ..RenderOptions::default()
    };
    CaptionSession::with_measure(transcript, opts, &mut Mono).unwrap()
}

const WORDS: &[&str] = &["one", "two", "three", "four", "five", "six", "seven"];

#[test]
fn mismatched_frame_rates_are_rejected() {
    let transcript = Transcript::from_entries(
        vec![TranscriptEntry {
            word: "hi".to_owned(),
            time: 0.0,
            duration: 1.0,
        }],
        Fps::integer(25).unwrap(),
    )
    .unwrap();
    let err =
        CaptionSession::with_measure(transcript, RenderOptions::default(), &mut Mono).unwrap_err();
    assert!(matches!(err, CapsyncError::Validation(_)));
}

#[test]
fn sink_config_places_box_at_bottom() {
    let s = session(WORDS, 30);
    let cfg = s.sink_config(640).unwrap();
    let (w, h) = s.options().frame_size();
    assert_eq!((cfg.width, cfg.height), (w, h));
    assert_eq!(cfg.fps, Fps::integer(30).unwrap());
    assert!((cfg.offset_y - (640.0 - s.options().box_height())).abs() < 1e-9);
}

#[test]
fn render_frame_with_checks_bounds() {
    let s = session(WORDS, 30);
    let first = s.render_frame_with(&mut BoldWordCanvas, FrameIndex(0)).unwrap();
    assert_eq!(first.image, b"one");
    let past_end = FrameIndex(s.schedule().len() as u64);
    assert!(matches!(
        s.render_frame_with(&mut BoldWordCanvas, past_end),
        Err(CapsyncError::Validation(_))
    ));
}

#[test]
fn cpu_rendering_requires_fonts() {
    let s = session(WORDS, 30);
    assert!(matches!(
        s.render_frame(FrameIndex(0)),
        Err(CapsyncError::Validation(_))
    ));
}

#[test]
fn streams_every_frame_in_order() {
    let s = session(WORDS, 30);
    for threading in [
        RenderThreading::default(),
        RenderThreading {
            parallel: true,
            threads: Some(3),
            chunk_size: 7,
            channel_capacity: 2,
            ..RenderThreading::default()
        },
    ] {
        let mut sink = InMemorySink::new();
        let stats = s
            .render_to_sink_with(|| Ok(BoldWordCanvas), &mut sink, &threading, &CancelToken::new())
            .unwrap();
        assert!(sink.is_finished());
        assert_eq!(sink.config(), Some(s.sink_config(640).unwrap()));
        assert_eq!(stats.frames_total, s.schedule().len() as u64);
        assert_eq!(sink.frames().len(), s.schedule().len());
        for (i, (idx, _)) in sink.frames().iter().enumerate() {
            assert_eq!(*idx, FrameIndex(i as u64));
        }

        let (frames, _) = s
            .render_frames_with(|| Ok(BoldWordCanvas), &threading, &CancelToken::new())
            .unwrap();
        let streamed: Vec<_> = sink.frames().iter().map(|(_, b)| b.clone()).collect();
        let collected: Vec<_> = frames.into_iter().map(|f| f.image).collect();
        assert_eq!(streamed, collected);
    }
}

#[test]
fn sink_errors_take_precedence() {
    let s = session(WORDS, 30);
    let mut sink = FailingSink::default();
    let err = s
        .render_to_sink_with(
            || Ok(BoldWordCanvas),
            &mut sink,
            &RenderThreading::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, CapsyncError::CompositionFailed(_)), "{err:?}");
    assert!(!sink.ended);
}

#[test]
fn render_failure_stops_the_sink_without_end() {
    let s = session(&["fine", "boom", "after"], 30);
    let mut sink = InMemorySink::new();
    let err = s
        .render_to_sink_with(
            || Ok(BoldWordCanvas),
            &mut sink,
            &RenderThreading::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, CapsyncError::RenderTask { .. }));
    assert!(!sink.is_finished());
}

#[test]
fn blank_policy_keeps_streaming() {
    let s = session(&["fine", "boom", "after"], 30);
    let mut sink = InMemorySink::new();
    let threading = RenderThreading {
        error_policy: FrameErrorPolicy::BlankFrame,
        ..RenderThreading::default()
    };
    let stats = s
        .render_to_sink_with(|| Ok(BoldWordCanvas), &mut sink, &threading, &CancelToken::new())
        .unwrap();
    assert!(sink.is_finished());
    assert!(stats.frames_blank > 0);
    assert_eq!(sink.frames().len() as u64, stats.frames_total);
}

#[test]
fn cancellation_surfaces_render_canceled() {
    let s = session(WORDS, 30);
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sink = InMemorySink::new();
    let err = s
        .render_to_sink_with(|| Ok(BoldWordCanvas), &mut sink, &RenderThreading::default(), &cancel)
        .unwrap_err();
    assert!(matches!(err, CapsyncError::RenderCanceled));
}

#[test]
fn empty_schedule_is_rejected() {
    let s = session(&[""], 30);
    assert!(s.schedule().is_empty());
    let mut sink = InMemorySink::new();
    assert!(matches!(
        s.render_to_sink_with(
            || Ok(BoldWordCanvas),
            &mut sink,
            &RenderThreading::default(),
            &CancelToken::new()
        ),
        Err(CapsyncError::Validation(_))
    ));
}

#[test]
fn leading_silence_keeps_frames_in_sync() {
    let entries = [("hi", 1.0), ("there", 1.5)]
        .iter()
        .map(|(w, t)| TranscriptEntry {
            word: (*w).to_owned(),
            time: *t,
            duration: 0.5,
        })
        .collect();
    let transcript = Transcript::from_entries(entries, Fps::integer(30).unwrap()).unwrap();
    let s = CaptionSession::with_measure(transcript, RenderOptions::default(), &mut Mono).unwrap();

    let mut sink = InMemorySink::new();
    s.render_to_sink_with(
        || Ok(BoldWordCanvas),
        &mut sink,
        &RenderThreading::default(),
        &CancelToken::new(),
    )
    .unwrap();

    let frames = sink.frames();
    assert_eq!(frames.len(), 60);
    assert!(frames[..30].iter().all(|(_, bytes)| bytes.is_empty()));
    assert_eq!(frames[30].1, b"hi");
    assert_eq!(frames[45].1, b"there");
}
