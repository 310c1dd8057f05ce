#![allow(clippy::float_cmp, clippy::cast_precision_loss)]

use super::*;

// =============================================================
// Helpers
// =============================================================

const W: usize = 4;
const H: usize = 3;

#[derive(Debug, Clone)]
struct Sprite {
    id: &'static str,
    rgb: [f64; 3],
    w: usize,
    h: usize,
    broken: bool,
}

fn sprite(id: &'static str, rgb: [f64; 3]) -> Sprite {
    Sprite { id, rgb, w: 2, h: 2, broken: false }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Clear(f64, f64),
    Alpha(f64),
    Draw(&'static str, f64, f64),
}

/// Records every call and composites source-over into a premultiplied RGBA raster.
#[derive(Debug)]
struct RasterSurface {
    ops: Vec<Op>,
    alpha: f64,
    pixels: Vec<[f64; 4]>,
}

impl RasterSurface {
    fn new() -> Self {
        Self { ops: Vec::new(), alpha: 1.0, pixels: vec![[0.5, 0.5, 0.5, 1.0]; W * H] }
    }

    fn drawn_ids(&self) -> Vec<&'static str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Draw(id, _, _) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RasterSurface {
    type Image = Sprite;

    fn size(&self) -> (f64, f64) {
        (W as f64, H as f64)
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.ops.push(Op::Clear(width, height));
        self.pixels.fill([0.0; 4]);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(Op::Alpha(alpha));
        self.alpha = alpha;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn draw_image(&mut self, image: &Sprite, x: f64, y: f64) -> Result<(), ParallaxError> {
        if image.broken {
            return Err(ParallaxError::Js(format!("InvalidStateError: {} is broken", image.id)));
        }
        self.ops.push(Op::Draw(image.id, x, y));
        let a = self.alpha;
        for dy in 0..image.h {
            for dx in 0..image.w {
                let px = x as usize + dx;
                let py = y as usize + dy;
                if px >= W || py >= H {
                    continue;
                }
                let dst = &mut self.pixels[py * W + px];
                for c in 0..3 {
                    dst[c] = image.rgb[c] * a + dst[c] * (1.0 - a);
                }
                dst[3] = a + dst[3] * (1.0 - a);
            }
        }
        Ok(())
    }
}

fn store_of(sprites: Vec<Sprite>) -> LayerStore<Sprite> {
    LayerStore::new(sprites.into_iter().map(|s| (s.id.to_owned(), s)))
}

fn four_layers() -> LayerStore<Sprite> {
    store_of(vec![
        sprite("background", [0.1, 0.2, 0.3]),
        sprite("man", [0.9, 0.1, 0.1]),
        sprite("title", [0.2, 0.8, 0.2]),
        sprite("gloss", [1.0, 1.0, 1.0]),
    ])
}

// =============================================================
// draw_frame
// =============================================================

#[test]
fn draw_frame_clears_whole_surface_first() {
    let mut surface = RasterSurface::new();
    let mut store = four_layers();
    draw_frame(&mut surface, &mut store).unwrap();
    assert_eq!(surface.ops[0], Op::Clear(W as f64, H as f64));
}

#[test]
fn draw_frame_sets_alpha_before_each_draw() {
    let mut surface = RasterSurface::new();
    let mut store = four_layers();
    store.set_opacity("man", 0.25);
    let drawn = draw_frame(&mut surface, &mut store).unwrap();
    assert_eq!(drawn, 4);
    assert_eq!(
        surface.ops[1..],
        [
            Op::Alpha(1.0),
            Op::Draw("background", 0.0, 0.0),
            Op::Alpha(0.25),
            Op::Draw("man", 0.0, 0.0),
            Op::Alpha(1.0),
            Op::Draw("title", 0.0, 0.0),
            Op::Alpha(1.0),
            Op::Draw("gloss", 0.0, 0.0),
        ]
    );
}

#[test]
fn draw_frame_uses_layer_positions() {
    let mut surface = RasterSurface::new();
    let mut store = four_layers();
    store.set_position("title", 1.0, 2.0);
    draw_frame(&mut surface, &mut store).unwrap();
    assert!(surface.ops.contains(&Op::Draw("title", 1.0, 2.0)));
}

#[test]
fn draw_frame_empty_store_only_clears() {
    let mut surface = RasterSurface::new();
    let mut store = store_of(Vec::new());
    assert_eq!(draw_frame(&mut surface, &mut store).unwrap(), 0);
    assert_eq!(surface.ops, vec![Op::Clear(W as f64, H as f64)]);
    assert!(surface.pixels.iter().all(|p| *p == [0.0; 4]));
}

#[test]
fn draw_order_follows_z_index_for_every_assignment() {
    let names = ["a", "b", "c", "d"];
    let keys = [-1, 0, 1];
    for combo in 0..keys.len().pow(4) {
        let z: Vec<i32> = (0..4)
            .map(|i| keys[(combo / keys.len().pow(i)) % keys.len()])
            .collect();

        let mut store = store_of(names.iter().map(|n| sprite(n, [0.0; 3])).collect());
        for (name, key) in names.iter().zip(&z) {
            store.set_z_index(name, *key);
        }
        let mut surface = RasterSurface::new();
        draw_frame(&mut surface, &mut store).unwrap();

        let drawn = surface.drawn_ids();
        let pos = |id: &str| names.iter().position(|n| *n == id).unwrap();
        for pair in drawn.windows(2) {
            let (first, second) = (pos(pair[0]), pos(pair[1]));
            assert!(z[first] <= z[second], "z order broken for {z:?}: {drawn:?}");
            if z[first] == z[second] {
                assert!(first < second, "tie not stable for {z:?}: {drawn:?}");
            }
        }
    }
}

#[test]
fn zero_opacity_matches_omitting_the_layer() {
    let mut with = RasterSurface::new();
    let mut store = four_layers();
    store.set_opacity("man", 0.0);
    store.set_position("man", 1.0, 1.0);
    draw_frame(&mut with, &mut store).unwrap();

    let mut without = RasterSurface::new();
    let mut store = store_of(vec![
        sprite("background", [0.1, 0.2, 0.3]),
        sprite("title", [0.2, 0.8, 0.2]),
        sprite("gloss", [1.0, 1.0, 1.0]),
    ]);
    draw_frame(&mut without, &mut store).unwrap();

    assert_eq!(with.pixels, without.pixels);
}

#[test]
fn partial_opacity_blends_over_lower_layers() {
    let mut surface = RasterSurface::new();
    let mut store = store_of(vec![sprite("bottom", [1.0, 0.0, 0.0]), sprite("top", [0.0, 0.0, 1.0])]);
    store.set_opacity("top", 0.5);
    draw_frame(&mut surface, &mut store).unwrap();
    assert_eq!(surface.pixels[0], [0.5, 0.0, 0.5, 1.0]);
}

#[test]
fn broken_layer_is_skipped_and_the_rest_still_drawn() {
    let mut surface = RasterSurface::new();
    let mut broken = sprite("man", [0.0; 3]);
    broken.broken = true;
    let mut store = store_of(vec![sprite("background", [0.0; 3]), broken, sprite("gloss", [0.0; 3])]);
    let err = draw_frame(&mut surface, &mut store).unwrap_err();
    assert!(matches!(&err, ParallaxError::Draw { layer, .. } if layer == "man"));
    assert_eq!(surface.drawn_ids(), vec!["background", "gloss"]);
}

#[test]
fn broken_bottom_layer_does_not_blank_the_canvas() {
    let mut surface = RasterSurface::new();
    let mut broken = sprite("background", [0.0; 3]);
    broken.broken = true;
    let mut store = store_of(vec![broken, sprite("man", [0.9, 0.1, 0.1]), sprite("gloss", [1.0, 1.0, 1.0])]);
    assert!(draw_frame(&mut surface, &mut store).is_err());
    assert_eq!(surface.drawn_ids(), vec!["man", "gloss"]);
    assert_eq!(surface.pixels[0], [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn first_of_several_failures_is_reported() {
    let mut surface = RasterSurface::new();
    let mut low = sprite("shadow", [0.0; 3]);
    low.broken = true;
    let mut high = sprite("gloss", [0.0; 3]);
    high.broken = true;
    let mut store = store_of(vec![high, low, sprite("title", [0.0; 3])]);
    store.set_z_index("gloss", 5);
    let err = draw_frame(&mut surface, &mut store).unwrap_err();
    assert!(matches!(&err, ParallaxError::Draw { layer, .. } if layer == "shadow"));
    assert_eq!(surface.drawn_ids(), vec!["title"]);
}

// =============================================================
// RenderLoop
// =============================================================

#[test]
fn loop_keeps_scheduling_frames() {
    let mut render_loop = RenderLoop::new(RasterSurface::new(), four_layers());
    for n in 0..500 {
        assert_eq!(render_loop.frame(), FrameOutcome::Continue, "frame {n} should reschedule");
    }
    assert_eq!(render_loop.frames(), 500);
}

#[test]
fn loop_redraws_every_layer_each_frame() {
    let mut render_loop = RenderLoop::new(RasterSurface::new(), four_layers());
    render_loop.frame();
    render_loop.frame();
    assert_eq!(render_loop.surface().drawn_ids().len(), 8);
}

#[test]
fn cancelled_handle_stops_the_loop() {
    let mut render_loop = RenderLoop::new(RasterSurface::new(), four_layers());
    let handle = render_loop.handle();
    assert_eq!(render_loop.frame(), FrameOutcome::Continue);
    handle.cancel();
    assert!(handle.is_cancelled());
    assert_eq!(render_loop.frame(), FrameOutcome::Stopped);
    assert_eq!(render_loop.frames(), 1);
}

#[test]
fn handle_clones_share_cancellation() {
    let render_loop = RenderLoop::new(RasterSurface::new(), four_layers());
    let a = render_loop.handle();
    let b = a.clone();
    b.cancel();
    assert!(a.is_cancelled());
    assert!(render_loop.handle().is_cancelled());
}

#[test]
fn draw_errors_do_not_stop_the_loop() {
    let mut broken = sprite("gloss", [0.0; 3]);
    broken.broken = true;
    let mut render_loop = RenderLoop::new(RasterSurface::new(), store_of(vec![broken]));
    for _ in 0..3 {
        assert_eq!(render_loop.frame(), FrameOutcome::Continue);
    }
    assert_eq!(render_loop.frames(), 3);
    assert_eq!(render_loop.failed_frames(), 3);
}

#[test]
fn healthy_layers_keep_rendering_beside_a_broken_one() {
    let mut broken = sprite("background", [0.0; 3]);
    broken.broken = true;
    let mut render_loop = RenderLoop::new(RasterSurface::new(), store_of(vec![broken, sprite("gloss", [0.0; 3])]));
    render_loop.frame();
    render_loop.frame();
    assert_eq!(render_loop.surface().drawn_ids(), vec!["gloss", "gloss"]);
    assert_eq!(render_loop.failed_frames(), 2);
}

#[test]
fn store_mut_changes_show_up_next_frame() {
    let mut render_loop = RenderLoop::new(RasterSurface::new(), four_layers());
    render_loop.store_mut().set_z_index("background", 10);
    render_loop.frame();
    assert_eq!(render_loop.surface().drawn_ids().last(), Some(&"background"));
    assert_eq!(render_loop.store().layers().last().map(|l| l.name.as_str()), Some("background"));
}
