use super::*;
use crate::foundation::core::Fps;
use crate::render::cpu::encode_png;

fn ffmpeg_tools_available() -> bool {
    let ffprobe = Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    is_ffmpeg_on_path() && ffprobe
}

fn test_background() -> Vec<u8> {
    let out = Command::new("ffmpeg")
        .args([
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x64:rate=10",
            "-t",
            "1",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-f",
            "matroska",
            "pipe:1",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    out.stdout
}

fn caption_frames(n: u64) -> Vec<RenderedFrame> {
    let px = [255u8, 255, 255, 128].repeat(64 * 16);
    let png = encode_png(&px, 64, 16).unwrap();
    (0..n)
        .map(|i| RenderedFrame {
            index: FrameIndex(i),
            image: png.clone(),
        })
        .collect()
}

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 64,
        height: 16,
        fps: Fps::integer(10).unwrap(),
        offset_y: 48.0,
    }
}

#[test]
fn parses_ffprobe_dimensions() {
    assert_eq!(parse_probe_dimensions("1280x720\n").unwrap(), (1280, 720));
    assert_eq!(parse_probe_dimensions("720x1280x\n").unwrap(), (720, 1280));
    assert!(parse_probe_dimensions("").is_err());
    assert!(parse_probe_dimensions("0x10").is_err());
    assert!(matches!(
        parse_probe_dimensions("widthxheight"),
        Err(CapsyncError::CompositionFailed(_))
    ));
}

#[test]
fn take_output_before_end_fails() {
    let mut c = FfmpegCompositor::new(vec![1, 2, 3]);
    assert!(matches!(
        c.take_output(),
        Err(CapsyncError::CompositionFailed(_))
    ));
}

#[test]
fn empty_background_is_rejected() {
    let mut c = FfmpegCompositor::new(Vec::new());
    assert!(matches!(c.begin(cfg()), Err(CapsyncError::Validation(_))));
}

#[test]
fn muxes_frames_over_background() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let bg = test_background();
    assert_eq!(probe_video_size(&bg).unwrap(), (64, 64));

    let out = FfmpegCompositor::mux(bg, cfg(), &caption_frames(10)).unwrap();
    // Matroska files start with the EBML magic.
    assert_eq!(&out[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    assert_eq!(probe_video_size(&out).unwrap(), (64, 64));
}

#[test]
fn invalid_background_reports_composition_failure() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let err = FfmpegCompositor::mux(b"not a video".to_vec(), cfg(), &caption_frames(3))
        .unwrap_err();
    assert!(matches!(err, CapsyncError::CompositionFailed(_)), "{err:?}");
}

#[test]
fn out_of_order_frames_are_rejected() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let mut c = FfmpegCompositor::new(test_background());
    c.begin(cfg()).unwrap();
    let frames = caption_frames(2);
    assert!(c.push_frame(FrameIndex(1), &frames[1].image).is_err());
}
