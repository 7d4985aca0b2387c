use tui_2048::core::{GameEngine, GameSnapshot, MemoryStore, TileSnapshot};
use tui_2048::term::{AdapterStatusView, AnchorY, FrameBuffer, GameView, Viewport};

fn screen_text(fb: &FrameBuffer) -> String {
    let mut all = String::new();
    for y in 0..fb.height() {
        all.push_str(&fb.row_text(y));
        all.push('\n');
    }
    all
}

fn tile(value: u32) -> Option<TileSnapshot> {
    Some(TileSnapshot {
        id: value,
        value,
        just_merged: false,
    })
}

#[test]
fn term_view_renders_border_corners() {
    let snap = GameEngine::new(1).snapshot();
    let view = GameView::default();

    // 4 tiles of 7x3 plus the border => 30x14.
    let fb = view.render(&snap, Viewport::new(30, 14));

    assert_eq!(fb.get(0, 0).unwrap().ch, '╭');
    assert_eq!(fb.get(29, 0).unwrap().ch, '╮');
    assert_eq!(fb.get(0, 13).unwrap().ch, '╰');
    assert_eq!(fb.get(29, 13).unwrap().ch, '╯');
}

#[test]
fn term_view_centers_board_by_default_on_tall_viewports() {
    let snap = GameSnapshot::default();
    let view = GameView::default();

    // start_y = (20 - 14) / 2 = 3
    let fb = view.render(&snap, Viewport::new(30, 20));
    assert_eq!(fb.get(0, 3).unwrap().ch, '╭');
}

#[test]
fn term_view_can_anchor_board_to_top() {
    let snap = GameSnapshot::default();
    let view = GameView::default().with_anchor_y(AnchorY::Top);

    let fb = view.render(&snap, Viewport::new(30, 20));
    assert_eq!(fb.get(0, 0).unwrap().ch, '╭');
}

#[test]
fn term_view_draws_every_tile_value() {
    let mut snap = GameSnapshot::default();
    snap.cells[1][2] = tile(2048);
    snap.cells[3][3] = tile(131072);

    let fb = GameView::default().render(&snap, Viewport::new(30, 14));

    // Row 1 middle line is y = 1 + 3 + 1.
    assert!(fb.row_text(5).contains("2048"));
    assert!(fb.row_text(11).contains("131072"));
}

#[test]
fn term_view_draws_side_panel_when_wide_enough() {
    let mut snap = GameSnapshot::default();
    snap.score = 1234;
    snap.best_score = 5678;
    snap.moves = 42;

    let view = GameView::default();
    let wide = screen_text(&view.render(&snap, Viewport::new(60, 24)));
    assert!(wide.contains("SCORE"));
    assert!(wide.contains("1234"));
    assert!(wide.contains("BEST"));
    assert!(wide.contains("5678"));
    assert!(wide.contains("MOVES"));

    let narrow = screen_text(&view.render(&snap, Viewport::new(30, 24)));
    assert!(!narrow.contains("SCORE"));
}

#[test]
fn term_view_shows_game_over_overlay() {
    let mut game = GameEngine::from_values(
        [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]],
        1,
        MemoryStore::new(),
    );
    assert!(game.check_game_over());

    let all = screen_text(&GameView::default().render(&game.snapshot(), Viewport::new(30, 14)));
    assert!(all.contains("GAME OVER"));
    assert!(!all.contains("YOU WIN!"));
}

#[test]
fn term_view_shows_win_overlay_until_keep_playing() {
    let mut snap = GameSnapshot::default();
    snap.cells[0][0] = tile(2048);
    snap.has_won = true;

    let view = GameView::default();
    let all = screen_text(&view.render(&snap, Viewport::new(30, 14)));
    assert!(all.contains("YOU WIN!"));
    assert!(all.contains("c: keep playing"));

    snap.keep_playing = true;
    let all = screen_text(&view.render(&snap, Viewport::new(30, 14)));
    assert!(!all.contains("YOU WIN!"));
}

#[test]
fn term_view_renders_adapter_status_when_enabled() {
    let snap = GameSnapshot::default();
    let view = GameView::default();

    let adapter = AdapterStatusView {
        enabled: true,
        client_count: 2,
        controller_id: Some(1),
        streaming_count: 1,
    };

    let all = screen_text(&view.render_with_adapter(
        &snap,
        Some(&adapter),
        Viewport::new(60, 24),
    ));
    assert!(all.contains("AI"));
    assert!(all.contains("ON"));
    assert!(all.contains("C 2"));
    assert!(all.contains("S 1"));
    assert!(all.contains("CTRL 1"));

    let off = screen_text(&view.render(&snap, Viewport::new(60, 24)));
    assert!(off.contains("OFF"));
}
