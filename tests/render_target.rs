//! Integration tests for the viewport render target set.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::{FakeBackend, GfxCall};
use ptcl_editor::{PixelRect, RenderBackend, RenderTargetSet, Swizzle};

fn target_set(width: i32, height: i32) -> RenderTargetSet<FakeBackend> {
    RenderTargetSet::new(FakeBackend::new(), width, height).unwrap()
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_clamps_to_one_pixel() {
    let mut set = target_set(64, 64);
    for (w, h) in [(800, 600), (0, 0), (-5, 10), (1, 1), (1920, -1)] {
        set.resize(w, h).unwrap();
        assert_eq!(set.size(), (w.max(1) as u32, h.max(1) as u32));
    }
}

#[test]
fn test_resize_updates_projection_half_extents() {
    let mut set = target_set(64, 64);
    set.resize(800, 600).unwrap();
    assert_eq!(set.projection().half_width(), (400.0, -400.0));
    assert_eq!(set.projection().half_height(), (300.0, -300.0));
}

#[test]
fn test_resize_bumps_generation_and_frees_previous() {
    let mut set = target_set(64, 64);
    let live = set.backend().live_textures();
    assert_eq!(live.get(), 2);

    for i in 1..=5 {
        set.resize(100 + i, 100).unwrap();
        assert_eq!(set.generation(), i as u64);
        assert_eq!(live.get(), 2);
    }
    assert_eq!(set.stats().resizes, 5);
}

#[test]
fn test_resize_clears_depth_and_sets_ui_swizzle() {
    let mut set = target_set(64, 64);
    set.backend_mut().calls.clear();
    set.resize(32, 32).unwrap();

    let color = set.color_texture().id;
    let depth = set.depth_texture().id;
    let calls = &set.backend().calls;
    assert!(calls.contains(&GfxCall::ClearDepth(depth)));
    assert_eq!(calls.last(), Some(&GfxCall::Swizzle(color, Swizzle::UI_IMAGE)));
}

#[test]
fn test_failed_color_allocation_keeps_previous_generation() {
    let mut set = target_set(640, 480);
    let live = set.backend().live_textures();
    let color = set.color_texture().id;

    set.backend_mut().fail_color = true;
    assert!(set.resize(1024, 768).is_err());

    assert_eq!(set.size(), (640, 480));
    assert_eq!(set.generation(), 0);
    assert_eq!(set.color_texture().id, color);
    assert_eq!(set.projection().half_width(), (320.0, -320.0));
    assert_eq!(set.stats().failed_resizes, 1);
    assert_eq!(live.get(), 2);
}

#[test]
fn test_failed_depth_allocation_releases_new_color() {
    let mut set = target_set(640, 480);
    let live = set.backend().live_textures();

    set.backend_mut().fail_depth = true;
    assert!(set.resize(1024, 768).is_err());
    assert_eq!(live.get(), 2);
    assert_eq!(set.size(), (640, 480));

    set.backend_mut().fail_depth = false;
    set.resize(1024, 768).unwrap();
    assert_eq!(set.size(), (1024, 768));
    assert_eq!(set.generation(), 1);
}

#[test]
fn test_initial_allocation_failure_is_reported() {
    let mut backend = FakeBackend::new();
    backend.fail_color = true;
    assert!(RenderTargetSet::new(backend, 10, 10).is_err());
}

#[test]
fn test_into_backend_frees_textures() {
    let set = target_set(64, 64);
    let live = set.backend().live_textures();
    let _backend = set.into_backend();
    assert_eq!(live.get(), 0);
}

// ============================================================================
// Bind / unbind
// ============================================================================

#[test]
fn test_bind_targets_current_generation() {
    let mut set = target_set(64, 64);
    set.resize(200, 100).unwrap();
    let (color, depth) = (set.color_texture().id, set.depth_texture().id);

    let _bound = set.bind();
    drop(_bound);

    let calls = set.backend().calls_since_bind();
    assert_eq!(calls[0], GfxCall::Bind { color, depth });
    assert_eq!(calls[1], GfxCall::Viewport(PixelRect::sized(200, 100)));
    assert_eq!(calls[2], GfxCall::Scissor(PixelRect::sized(200, 100)));
}

#[test]
fn test_unbind_restores_window_rect() {
    let mut set = target_set(300, 200);
    set.set_window_size(1920, 1080);
    {
        let mut bound = set.bind();
        bound.backend().clear(Some([0.25, 0.25, 0.25, 1.0]), true);
    }

    let color = set.color_texture().id;
    let window = PixelRect::sized(1920, 1080);
    let tail: Vec<_> = set.backend().calls.iter().rev().take(5).rev().cloned().collect();
    assert_eq!(
        tail,
        vec![
            GfxCall::Invalidate(color),
            GfxCall::RestoreWindow,
            GfxCall::Viewport(window),
            GfxCall::Scissor(window),
            GfxCall::Swizzle(color, Swizzle::UI_IMAGE),
        ]
    );
}

#[test]
fn test_render_swizzle_while_bound() {
    let mut set = target_set(16, 16);
    let color = set.color_texture().id;
    set.backend_mut().calls.clear();

    drop(set.bind());
    assert_eq!(set.backend().calls[0], GfxCall::Swizzle(color, Swizzle::RENDER_TARGET));
}

#[test]
fn test_bind_unbind_symmetry() {
    let mut set = target_set(16, 16);
    for _ in 0..10 {
        let _bound = set.bind();
    }
    let stats = set.stats();
    assert_eq!(stats.binds, 10);
    assert_eq!(stats.unbinds, 10);

    let backend = set.backend();
    let binds = backend.count(|c| matches!(c, GfxCall::Bind { .. }));
    let restores = backend.count(|c| matches!(c, GfxCall::RestoreWindow));
    assert_eq!(binds, restores);
}

fn draw_with_early_return(set: &mut RenderTargetSet<FakeBackend>, bail: bool) -> Option<()> {
    let mut bound = set.bind();
    bound.backend().clear(None, true);
    if bail {
        return None;
    }
    bound.backend().clear(Some([0.0; 4]), false);
    Some(())
}

#[test]
fn test_unbind_on_early_return() {
    let mut set = target_set(16, 16);
    assert!(draw_with_early_return(&mut set, true).is_none());
    assert!(draw_with_early_return(&mut set, false).is_some());
    assert_eq!(set.stats().binds, 2);
    assert_eq!(set.stats().unbinds, 2);
}

#[test]
fn test_unbind_on_panic() {
    let mut set = target_set(16, 16);
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _bound = set.bind();
        panic!("draw failed");
    }));
    assert!(result.is_err());
    assert_eq!(set.stats().unbinds, 1);
    assert_eq!(set.backend().calls.last().map(|c| matches!(c, GfxCall::Swizzle(..))), Some(true));
}

#[test]
fn test_window_size_clamps_to_one() {
    let mut set = target_set(16, 16);
    set.set_window_size(0, 0);
    assert_eq!(set.window_size(), (1, 1));
}
