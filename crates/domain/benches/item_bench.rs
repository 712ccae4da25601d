use criterion::{Criterion, criterion_group, criterion_main};
use dispatcher::{Action, CommandDispatcher, EventDispatcher, Middleware};
use domain::{AdjustItemQuantityCommand, CreateItemCommand, ItemReducer, register_handlers};
use state_store::{InMemoryStateStore, StateStore};

fn wired_store() -> InMemoryStateStore {
    let store = InMemoryStateStore::new();
    store.add_reducer(ItemReducer);

    let commands = CommandDispatcher::new();
    let events = EventDispatcher::new();
    register_handlers(&commands, &events, &store).unwrap();
    store
        .install_middleware(Middleware::new(commands, events))
        .unwrap();
    store
}

async fn send(store: &InMemoryStateStore, action: Action) {
    store
        .dispatch(action)
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();
}

fn bench_create_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(async { wired_store() });

    c.bench_function("domain/create_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = CreateItemCommand::new("Widget", None, 1);
                send(&store, Action::from_message(&cmd).unwrap()).await;
            });
        });
    });
}

fn bench_adjust_quantity(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(async { wired_store() });
    let create = CreateItemCommand::new("Widget", None, 0);
    let item_id = create.item_id;
    rt.block_on(send(&store, Action::from_message(&create).unwrap()));

    c.bench_function("domain/adjust_quantity", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = AdjustItemQuantityCommand::new(item_id, 1);
                send(&store, Action::from_message(&cmd).unwrap()).await;
            });
        });
    });
}

criterion_group!(benches, bench_create_item, bench_adjust_quantity);
criterion_main!(benches);
