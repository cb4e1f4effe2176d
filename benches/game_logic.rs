use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parchis_server::core::{Board, GameEngine, Piece, ScriptedDice};
use parchis_server::types::{Color, ConnectionId, DiceRoll, DieSelector, PieceLocation};

/// Two-player match with Red to move after rolling (3, 4)
fn midgame() -> GameEngine {
    let mut engine = GameEngine::new(Box::new(ScriptedDice::new([(3, 4)])));
    let (red, _) = engine.join("ana", None, ConnectionId(1)).unwrap();
    let (blue, _) = engine.join("bo", None, ConnectionId(2)).unwrap();
    engine.start(red).unwrap();
    engine.determine_roll(red, Some(DiceRoll::new(6, 6))).unwrap();
    engine.determine_roll(blue, Some(DiceRoll::new(1, 2))).unwrap();

    for (piece, cell) in [(0, 40), (1, 12), (2, 60)] {
        engine
            .arrange_piece(Color::Red, piece, PieceLocation::Main(cell))
            .unwrap();
    }
    engine
        .arrange_piece(Color::Red, 3, PieceLocation::Lane(2))
        .unwrap();
    for (piece, cell) in [(0, 43), (1, 19)] {
        engine
            .arrange_piece(Color::Blue, piece, PieceLocation::Main(cell))
            .unwrap();
    }
    engine.roll_dice(red).unwrap();
    engine
}

fn bench_available_actions(c: &mut Criterion) {
    let engine = midgame();

    c.bench_function("available_actions", |b| {
        b.iter(|| black_box(engine.available_actions()))
    });
}

fn bench_move_with_capture(c: &mut Criterion) {
    let red = midgame().current_player().unwrap().id();

    c.bench_function("move_token_capture", |b| {
        b.iter_batched(
            midgame,
            |mut e| black_box(e.move_token(red, 0, DieSelector::First)),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_preview(c: &mut Criterion) {
    let board = Board::new();
    let mut piece = Piece::new(Color::Green, 0);
    piece.place(PieceLocation::Main(44));

    c.bench_function("piece_preview_into_lane", |b| {
        b.iter(|| black_box(piece.preview(black_box(10), &board)))
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let engine = midgame();

    c.bench_function("engine_snapshot", |b| b.iter(|| black_box(engine.snapshot())));
}

criterion_group!(
    benches,
    bench_available_actions,
    bench_move_with_capture,
    bench_preview,
    bench_snapshot
);
criterion_main!(benches);
