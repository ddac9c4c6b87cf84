use super::*;
use crate::foundation::core::{Point, Rect};

fn test_fonts() -> Option<Arc<FontCache>> {
    let dir = std::env::var_os("CAPSYNC_FONT_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("assets/fonts"));
    if let Ok(fonts) = FontCache::from_family_dir(&dir, "Montserrat") {
        return Some(Arc::new(fonts));
    }
    let dejavu = std::path::Path::new("/usr/share/fonts/truetype/dejavu");
    FontCache::from_paths(&dejavu.join("DejaVuSans.ttf"), &dejavu.join("DejaVuSans-Bold.ttf"))
        .ok()
        .map(Arc::new)
}

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png).unwrap().to_rgba8()
}

#[test]
fn unpremultiply_restores_straight_alpha() {
    let mut px = vec![0u8, 0, 0, 0, 10, 20, 30, 255, 64, 32, 0, 128];
    unpremultiply_in_place(&mut px);
    assert_eq!(&px[..4], &[0, 0, 0, 0]);
    assert_eq!(&px[4..8], &[10, 20, 30, 255]);
    assert_eq!(&px[8..], &[128, 64, 0, 128]);
}

#[test]
fn encode_png_round_trips_dimensions() {
    let premul = vec![255u8; 3 * 2 * 4];
    let png = encode_png(&premul, 3, 2).unwrap();
    let img = decode(&png);
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1).0, [255, 255, 255, 255]);
}

#[test]
fn draws_clear_color_and_highlight() {
    let Some(fonts) = test_fonts() else {
        eprintln!("skipping: no fixture fonts");
        return;
    };
    let mut canvas = CpuCanvas::new(fonts, 24.0).unwrap();
    let scene = FrameScene {
        width: 64,
        height: 32,
        clear: Rgba8::new(0, 0, 0, 255),
        ops: vec![DrawOp::Highlight {
            rect: Rect::new(8.0, 8.0, 40.0, 24.0),
            radius: 4.0,
            scale: 1.0,
            color: Rgba8::new(255, 0, 0, 255),
        }],
    };
    let img = decode(&canvas.draw_frame(&scene).unwrap());
    assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 255]);
    assert_eq!(img.get_pixel(24, 16).0, [255, 0, 0, 255]);
}

#[test]
fn measures_and_draws_text_deterministically() {
    let Some(fonts) = test_fonts() else {
        eprintln!("skipping: no fixture fonts");
        return;
    };
    let mut canvas = CpuCanvas::new(fonts, 32.0).unwrap();
    let short = canvas.measure_width("hi", FaceWeight::Regular).unwrap();
    let long = canvas.measure_width("hello there", FaceWeight::Regular).unwrap();
    let space = canvas.measure_width(" ", FaceWeight::Regular).unwrap();
    assert!(short > 0.0);
    assert!(long > short);
    assert!(space > 0.0);
    assert_eq!(canvas.measure_width("", FaceWeight::Bold).unwrap(), 0.0);

    let scene = FrameScene {
        width: 128,
        height: 48,
        clear: Rgba8::TRANSPARENT,
        ops: vec![DrawOp::Text {
            text: "Hi".to_owned(),
            weight: FaceWeight::Bold,
            origin: Point::new(8.0, 36.0),
            color: Rgba8::WHITE,
        }],
    };
    let a = canvas.draw_frame(&scene).unwrap();
    let b = canvas.draw_frame(&scene).unwrap();
    assert_eq!(a, b);
    let img = decode(&a);
    assert!(img.pixels().any(|p| p.0[3] > 0), "text left no ink");
}
