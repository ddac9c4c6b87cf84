use super::*;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::CapsyncResult;
use crate::layout::lines::layout_lines;
use crate::render::canvas::TextMeasure;
use crate::style::updater::Style;

struct Mono;

impl TextMeasure for Mono {
    fn measure_width(&mut self, text: &str, _weight: FaceWeight) -> CapsyncResult<f64> {
        Ok(text.chars().count() as f64 * 10.0)
    }
}

fn words() -> Vec<Word> {
    let texts = ["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc", "dddd", "eeeeeeeeee", "ff"];
    let mut out = vec![Word::sentinel()];
    for (i, t) in texts.iter().enumerate() {
        out.push(Word {
            text: (*t).to_owned(),
            start_secs: i as f64,
            duration_secs: 1.0,
            frame: FrameIndex(i as u64 * 30),
        });
    }
    out
}

fn opts() -> RenderOptions {
    RenderOptions {
        width: 400,
        padding: 20.0,
        font_size: 40.0,
        line_spacing: 1.5,
        max_lines: 2,
        center: false,
        ..RenderOptions::default()
    }
}

fn task(active_word: usize) -> FrameTask {
    FrameTask {
        index: FrameIndex(0),
        active_word,
        progress: 1.0,
    }
}

fn text_ops(scene: &FrameScene) -> Vec<(String, FaceWeight, Point)> {
    scene
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text {
                text,
                weight,
                origin,
                ..
            } => Some((text.clone(), *weight, *origin)),
            DrawOp::Highlight { .. } => None,
        })
        .collect()
}

#[test]
fn left_to_right_positions_and_highlight() {
    let ws = words();
    let o = opts();
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    assert_eq!(layout.lines().len(), 2);

    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(2));
    assert_eq!((scene.width, scene.height), (400, 160));
    assert_eq!(scene.text_count(), 6);

    let texts = text_ops(&scene);
    assert_eq!(texts[0].2, Point::new(20.0, 60.0));
    assert_eq!(texts[1].0, "bbbbbbbbbb");
    assert_eq!(texts[1].1, FaceWeight::Bold);
    assert_eq!(texts[1].2, Point::new(130.0, 60.0));
    assert_eq!(texts[2].2, Point::new(240.0, 60.0));
    assert_eq!(texts[3].2, Point::new(20.0, 120.0));
    assert_eq!(texts[5].2, Point::new(180.0, 120.0));
    assert!(texts.iter().filter(|t| t.1 == FaceWeight::Bold).count() == 1);

    let Some(DrawOp::Highlight { rect, radius, .. }) = scene.highlight() else {
        panic!("expected a highlight");
    };
    assert_eq!(*radius, 15.0);
    assert!((rect.x0 - 115.0).abs() < 1e-9);
    assert!((rect.y0 - 14.2).abs() < 1e-9);
    assert!((rect.width() - 130.0).abs() < 1e-9);
    assert!((rect.height() - 70.0).abs() < 1e-9);
}

#[test]
fn highlight_is_painted_before_its_word() {
    let ws = words();
    let o = opts();
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(2));
    let hi = scene
        .ops
        .iter()
        .position(|op| matches!(op, DrawOp::Highlight { .. }))
        .unwrap();
    assert!(matches!(
        &scene.ops[hi + 1],
        DrawOp::Text { weight: FaceWeight::Bold, .. }
    ));
}

#[test]
fn centered_lines_start_at_half_the_slack() {
    let ws = words();
    let o = RenderOptions {
        center: true,
        ..opts()
    };
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(1));
    let texts = text_ops(&scene);
    // Line 0 is 320 wide, line 1 is 180 wide.
    assert_eq!(texts[0].2.x, 40.0);
    assert_eq!(texts[3].2.x, 110.0);
}

#[test]
fn right_to_left_mirrors_left_to_right() {
    let ws = words();
    let ltr = opts();
    let rtl = RenderOptions {
        rtl: true,
        ..opts()
    };
    let layout = layout_lines(&ws, &mut Mono, &ltr).unwrap();
    let a = text_ops(&compose_frame(&SceneContext::new(&ws, &layout, &ltr), &task(3)));
    let b = text_ops(&compose_frame(&SceneContext::new(&ws, &layout, &rtl), &task(3)));
    assert_eq!(a.len(), b.len());
    for (i, (l, r)) in a.iter().zip(&b).enumerate() {
        let w = layout.word_widths()[i + 1];
        assert_eq!(l.0, r.0);
        assert!((r.2.x - (400.0 - l.2.x - w)).abs() < 1e-9, "word {i}");
        assert_eq!(l.2.y, r.2.y);
    }
}

#[test]
fn window_pages_and_relative_highlight() {
    let ws = words();
    let o = RenderOptions {
        max_lines: 1,
        ..opts()
    };
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(5));
    let texts = text_ops(&scene);
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0].0, "dddd");
    assert_eq!(texts[1].0, "eeeeeeeeee");
    assert_eq!(texts[1].1, FaceWeight::Bold);
    // The second window renders on the first row.
    assert_eq!(texts[1].2, Point::new(70.0, 60.0));
}

#[test]
fn appearing_words_hides_future_words_and_box() {
    let ws = words();
    let o = RenderOptions {
        style: Style::appearing_words(),
        ..opts()
    };
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(2));
    assert_eq!(scene.text_count(), 2);
    assert!(scene.highlight().is_none());
}

#[test]
fn composition_is_deterministic() {
    let ws = words();
    let o = opts();
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let ctx = SceneContext::new(&ws, &layout, &o);
    let t = FrameTask {
        index: FrameIndex(7),
        active_word: 4,
        progress: 0.37,
    };
    assert_eq!(compose_frame(&ctx, &t), compose_frame(&ctx, &t));
}

#[test]
fn lead_in_frames_are_transparent() {
    let ws = words();
    let o = RenderOptions {
        background_color: Rgba8::new(0, 0, 0, 160),
        ..opts()
    };
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(0));
    assert_eq!((scene.width, scene.height), o.frame_size());
    assert_eq!(scene.clear, Rgba8::TRANSPARENT);
    assert!(scene.ops.is_empty());
}

#[test]
fn pauses_keep_the_page_without_highlight() {
    let mut ws = words();
    ws.insert(
        4,
        Word {
            text: String::new(),
            start_secs: 2.5,
            duration_secs: 0.5,
            frame: FrameIndex(75),
        },
    );
    let o = opts();
    let layout = layout_lines(&ws, &mut Mono, &o).unwrap();
    let scene = compose_frame(&SceneContext::new(&ws, &layout, &o), &task(4));
    let texts = text_ops(&scene);
    assert_eq!(texts.len(), 6);
    assert!(texts.iter().all(|t| t.1 == FaceWeight::Regular));
    assert!(scene.highlight().is_none());
}
