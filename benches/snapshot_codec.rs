//! Snapshot encode/decode and checksum cost for a mid-game Kalah board.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use duel_sync::core::{DeterministicStream, ParticipantId, Side, SideMap};
use duel_sync::games::{KalahAction, KalahState};
use duel_sync::protocol::{codec, ActionPayload, DuelMessage, Snapshot};

type Message = DuelMessage<KalahState, KalahAction>;

fn mid_game() -> Message {
    let state = KalahState {
        pits: SideMap::from_pair([3, 0, 7, 5, 1, 6], [2, 4, 0, 9, 5, 1]),
        stores: SideMap::from_pair(4, 1),
    };
    let mut snapshot = Snapshot::new(42, 1, Side::Second, state);
    snapshot.turn_time_left_ms = Some(9_500);
    snapshot.checksum = codec::state_checksum(&snapshot.state).ok();
    snapshot.stream = Some(DeterministicStream::derive("duel-bench", 1).state());
    DuelMessage::new(ParticipantId::new("host"), ActionPayload::State { snapshot })
}

fn bench_codec(c: &mut Criterion) {
    let msg = mid_game();
    let bytes = codec::encode(&msg).unwrap();

    c.bench_function("snapshot_encode", |b| b.iter(|| codec::encode(black_box(&msg)).unwrap()));
    c.bench_function("snapshot_decode", |b| {
        b.iter(|| codec::decode::<KalahState, KalahAction>(black_box(&bytes)).unwrap())
    });

    let ActionPayload::State { snapshot } = &msg.action else {
        return;
    };
    c.bench_function("state_checksum", |b| {
        b.iter(|| codec::state_checksum(black_box(&snapshot.state)).unwrap())
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
