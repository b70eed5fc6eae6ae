use super::*;

fn profile(name: &str) -> Profile {
    Profile { id: Uuid::new_v4(), name: name.into(), avatar: None }
}

fn open_gate() -> AccessGate {
    AccessGate::new(None, [])
}

fn white_grid(width: usize, height: usize) -> Grid {
    Grid::filled(width, height, 31, 32)
}

fn color_at(grid: &Grid, x: u32, y: u32) -> u8 {
    grid.cell(x, y).unwrap().color
}

// =============================================================================
// Pencil
// =============================================================================

#[test]
fn pencil_sets_color_and_placer() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    let event = apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 5).unwrap();

    assert_eq!(event, ServerEvent::PencilDraw { x: 0, y: 0, color: 5, user: alice.clone() });
    assert_eq!(grid.cell(0, 0), Some(Cell { color: 5, placer: Some(alice.id) }));
    assert_eq!(stack.len(), 1);
    assert_eq!(grid.contributor(alice.id), Some(&alice));
}

#[test]
fn pencil_with_same_color_still_records_an_undo_unit() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 31).unwrap();

    assert_eq!(stack.len(), 1);
    assert_eq!(grid.cell(1, 1).unwrap().placer, Some(alice.id));
}

#[test]
fn out_of_range_cell_is_rejected_without_mutation() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    let result = apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 3, 0, 5);

    assert_eq!(result, Err(DrawRejection::InvalidCell));
    assert!(stack.is_empty());
    assert!(grid.contributors().is_empty());
}

#[test]
fn out_of_palette_color_is_rejected_without_mutation() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    let result = apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 32);

    assert_eq!(result, Err(DrawRejection::InvalidColor));
    assert!(stack.is_empty());
    assert_eq!(color_at(&grid, 1, 1), 31);
}

#[test]
fn unauthorized_actor_is_rejected_before_other_checks() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let owner = profile("owner");
    let mallory = profile("mallory");
    let gate = AccessGate::new(Some(owner.id), [owner.id]);

    let result = apply(Stroke::Pencil, &mut grid, &gate, &mallory, &mut stack, 99, 99, 200);

    assert_eq!(result, Err(DrawRejection::Unauthorized));
    assert!(stack.is_empty());
}

// =============================================================================
// Brush
// =============================================================================

#[test]
fn brush_on_interior_cell_covers_five_cells() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    let event = apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 2).unwrap();

    assert_eq!(event, ServerEvent::BrushDraw { x: 1, y: 1, color: 2, user: alice.clone() });
    for (x, y) in [(1, 1), (0, 1), (1, 0), (2, 1), (1, 2)] {
        assert_eq!(color_at(&grid, x, y), 2, "cell ({x}, {y})");
    }
    for (x, y) in [(0, 0), (2, 0), (0, 2), (2, 2)] {
        assert_eq!(color_at(&grid, x, y), 31, "diagonal ({x}, {y}) untouched");
    }

    let events = undo(&mut grid, &mut stack);
    assert_eq!(events.len(), 5);
}

#[test]
fn brush_at_corner_clips_to_grid() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 4).unwrap();

    assert_eq!(color_at(&grid, 0, 0), 4);
    assert_eq!(color_at(&grid, 1, 0), 4);
    assert_eq!(color_at(&grid, 0, 1), 4);
    assert_eq!(color_at(&grid, 1, 1), 31);
    assert_eq!(undo(&mut grid, &mut stack).len(), 3);
}

#[test]
fn brush_at_far_corner_clips_to_grid() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 2, 2, 4).unwrap();

    assert_eq!(undo(&mut grid, &mut stack).len(), 3);
}

#[test]
fn brush_skips_cells_already_in_color() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    let bob = profile("bob");
    apply(Stroke::Pencil, &mut grid, &open_gate(), &bob, &mut stack, 0, 1, 7).unwrap();

    let mut alice_stack = UndoStack::new();
    apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut alice_stack, 1, 1, 7).unwrap();

    assert_eq!(grid.cell(0, 1).unwrap().placer, Some(bob.id), "unchanged cell keeps its placer");
    assert_eq!(undo(&mut grid, &mut alice_stack).len(), 4);
}

#[test]
fn brush_that_changes_nothing_is_a_no_op() {
    let mut grid = white_grid(3, 3);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    let result = apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 31);

    assert_eq!(result, Err(DrawRejection::NoChange));
    assert!(stack.is_empty());
    assert!(grid.contributors().is_empty());
}

#[test]
fn brush_on_single_cell_grid_touches_only_anchor() {
    let mut grid = white_grid(1, 1);
    let mut stack = UndoStack::new();
    let alice = profile("alice");

    apply(Stroke::Brush, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 0).unwrap();

    assert_eq!(undo(&mut grid, &mut stack).len(), 1);
}

// =============================================================================
// Undo
// =============================================================================

#[test]
fn undo_restores_prior_color_and_placer() {
    let mut grid = white_grid(3, 3);
    let (u1, u2) = (profile("u1"), profile("u2"));
    let mut s1 = UndoStack::new();
    let mut s2 = UndoStack::new();
    apply(Stroke::Pencil, &mut grid, &open_gate(), &u1, &mut s1, 0, 0, 5).unwrap();
    apply(Stroke::Pencil, &mut grid, &open_gate(), &u2, &mut s2, 0, 0, 7).unwrap();

    let events = undo(&mut grid, &mut s2);

    assert_eq!(events, vec![ServerEvent::ReceiveUndo { x: 0, y: 0, color: 5, user: Some(u1.clone()) }]);
    assert_eq!(grid.cell(0, 0), Some(Cell { color: 5, placer: Some(u1.id) }));
}

#[test]
fn undo_of_first_placement_restores_unset_placer() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 1, 0, 3).unwrap();

    let events = undo(&mut grid, &mut stack);

    assert_eq!(events, vec![ServerEvent::ReceiveUndo { x: 1, y: 0, color: 31, user: None }]);
    assert_eq!(grid.cell(1, 0), Some(Cell { color: 31, placer: None }));
}

#[test]
fn undo_pops_newest_unit_first() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 1).unwrap();
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 2).unwrap();

    undo(&mut grid, &mut stack);
    assert_eq!(color_at(&grid, 0, 0), 1);
    undo(&mut grid, &mut stack);
    assert_eq!(color_at(&grid, 0, 0), 31);
    assert!(stack.is_empty());
}

#[test]
fn undo_on_empty_stack_does_nothing() {
    let mut grid = white_grid(2, 2);
    let before = grid.snapshot();
    let mut stack = UndoStack::new();

    assert!(undo(&mut grid, &mut stack).is_empty());
    assert_eq!(grid.snapshot(), before);
}

#[test]
fn undo_is_not_gated_by_authorization() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let owner = profile("owner");
    let alice = profile("alice");
    let mut gate = AccessGate::new(Some(owner.id), [owner.id, alice.id]);
    apply(Stroke::Pencil, &mut grid, &gate, &alice, &mut stack, 0, 0, 9).unwrap();

    gate.deauthorize(owner.id, alice.id, true).unwrap();
    assert!(!gate.is_authorized(alice.id));
    let events = undo(&mut grid, &mut stack);

    assert_eq!(events.len(), 1);
    assert_eq!(color_at(&grid, 0, 0), 31);
}

#[test]
fn undo_skips_cells_that_vanished() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 9).unwrap();

    let mut other = white_grid(1, 1);
    assert!(undo(&mut other, &mut stack).is_empty());
}

#[test]
fn clear_drops_every_unit() {
    let mut grid = white_grid(2, 2);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, 1).unwrap();
    apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 1, 1, 1).unwrap();

    stack.clear();

    assert!(stack.is_empty());
    assert!(undo(&mut grid, &mut stack).is_empty());
    assert_eq!(color_at(&grid, 0, 0), 1);
}

#[test]
fn stack_drops_oldest_unit_past_limit() {
    let mut grid = white_grid(4, 4);
    let mut stack = UndoStack::with_limit(3);
    let alice = profile("alice");
    for color in 1..=5 {
        apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, 0, 0, color).unwrap();
    }

    assert_eq!(stack.len(), 3);

    // Units for colors 5, 4 and 3 remain; undoing all of them lands on 2,
    // the color the oldest retained stroke overwrote.
    for _ in 0..3 {
        assert_eq!(undo(&mut grid, &mut stack).len(), 1);
    }
    assert_eq!(color_at(&grid, 0, 0), 2);
    assert!(undo(&mut grid, &mut stack).is_empty());
}

#[test]
fn repeated_strokes_stay_within_default_limit() {
    let mut grid = white_grid(4, 4);
    let mut stack = UndoStack::new();
    let alice = profile("alice");
    for i in 0..1000u32 {
        let color = u8::try_from(i % 31).unwrap();
        apply(Stroke::Pencil, &mut grid, &open_gate(), &alice, &mut stack, i % 4, (i / 4) % 4, color).unwrap();
    }

    assert_eq!(stack.len(), crate::config::DEFAULT_UNDO_DEPTH_LIMIT);
}
