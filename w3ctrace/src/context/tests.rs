use super::*;
use crate::{SpanId, Trace, TraceFlags, TraceId, Version};
use futures_util::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, PartialEq)]
struct ValueA(u64);
#[derive(Debug, PartialEq)]
struct ValueB(u64);

fn sample_trace() -> Trace {
    Trace::from_parts(
        Version::SUPPORTED,
        TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736),
        SpanId::from(0x00f0_67aa_0ba9_02b7),
        TraceFlags::SAMPLED,
    )
}

#[test]
fn context_immutable() {
    // start with Current, which should be an empty context
    let cx = Context::current();
    assert_eq!(cx.get::<ValueA>(), None);
    assert_eq!(cx.get::<ValueB>(), None);

    // with_value should return a new context,
    // leaving the original context unchanged
    let cx_new = cx.with_value(ValueA(1));

    assert_eq!(cx.get::<ValueA>(), None);
    assert_eq!(cx.get::<ValueB>(), None);
    assert_eq!(cx_new.get::<ValueA>(), Some(&ValueA(1)));

    let cx_newer = cx_new.with_value(ValueB(1));

    // cx and cx_new are unchanged
    assert_eq!(cx.get::<ValueA>(), None);
    assert_eq!(cx.get::<ValueB>(), None);
    assert_eq!(cx_new.get::<ValueA>(), Some(&ValueA(1)));
    assert_eq!(cx_new.get::<ValueB>(), None);

    // cx_newer should contain both values
    assert_eq!(cx_newer.get::<ValueA>(), Some(&ValueA(1)));
    assert_eq!(cx_newer.get::<ValueB>(), Some(&ValueB(1)));
}

#[test]
fn with_value_replaces_same_type() {
    let cx = Context::new().with_value(ValueA(1));
    let replaced = cx.with_value(ValueA(2));

    assert_eq!(cx.get::<ValueA>(), Some(&ValueA(1)));
    assert_eq!(replaced.get::<ValueA>(), Some(&ValueA(2)));
}

#[test]
fn trace_absent_and_present() {
    let cx = Context::new();
    assert_eq!(cx.trace(), None);
    assert!(!cx.has_trace());

    let with_trace = cx.with_trace(sample_trace());
    assert_eq!(with_trace.trace(), Some(sample_trace()));
    assert!(with_trace.has_trace());
    assert_eq!(cx.trace(), None, "original context is untouched");
}

#[test]
fn invalid_trace_is_not_stored() {
    let cx = Context::new().with_trace(Trace::default());
    assert_eq!(cx.trace(), None);

    let unsupported = sample_trace();
    let unsupported = Trace::from_parts(
        Version::from_u8(0xfe),
        unsupported.trace_id(),
        unsupported.parent_id(),
        unsupported.flags(),
    );
    let cx = Context::new()
        .with_trace(sample_trace())
        .with_trace(unsupported);
    assert_eq!(cx.trace(), Some(sample_trace()), "previous trace is kept");
}

#[test]
fn trace_survives_other_values() {
    let cx = Context::new()
        .with_trace(sample_trace())
        .with_value(ValueA(1));
    assert_eq!(cx.trace(), Some(sample_trace()));
    assert_eq!(cx.get::<ValueA>(), Some(&ValueA(1)));
}

#[test]
fn current_with_trace() {
    let _outer = Context::new().with_value(ValueA(1)).attach();
    assert_eq!(Context::current().trace(), None);

    {
        let _inner = Context::current_with_trace(sample_trace()).attach();
        let current = Context::current();
        assert_eq!(current.trace(), Some(sample_trace()));
        assert_eq!(current.get::<ValueA>(), Some(&ValueA(1)));
    }

    assert_eq!(Context::current().trace(), None);
}

#[test]
fn debug_shows_trace() {
    let cx = Context::new().with_trace(sample_trace()).with_value(ValueA(1));
    let debug = format!("{cx:?}");
    assert!(debug.contains("entries: 2"), "{debug}");
    assert!(debug.contains("4bf92f3577b34da6a3ce929d0e0e4736"), "{debug}");
}

#[test]
fn nested_contexts() {
    let _outer_guard = Context::new().with_value(ValueA(1)).attach();

    // Only value `a` is set
    let current = Context::current();
    assert_eq!(current.get(), Some(&ValueA(1)));
    assert_eq!(current.get::<ValueB>(), None);

    {
        let _inner_guard = Context::current_with_value(ValueB(42)).attach();
        // Both values are set in inner context
        let current = Context::current();
        assert_eq!(current.get(), Some(&ValueA(1)));
        assert_eq!(current.get(), Some(&ValueB(42)));

        assert!(Context::map_current(|cx| {
            assert_eq!(cx.get(), Some(&ValueA(1)));
            assert_eq!(cx.get(), Some(&ValueB(42)));
            true
        }));
    }

    // Resets to only value `a` when inner guard is dropped
    let current = Context::current();
    assert_eq!(current.get(), Some(&ValueA(1)));
    assert_eq!(current.get::<ValueB>(), None);
}

#[test]
fn overlapping_contexts() {
    let outer_guard = Context::new().with_value(ValueA(1)).attach();
    let inner_guard = Context::current_with_value(ValueB(42)).attach();

    let current = Context::current();
    assert_eq!(current.get(), Some(&ValueA(1)));
    assert_eq!(current.get(), Some(&ValueB(42)));

    drop(outer_guard);

    // `inner_guard` is still alive so both values should still be accessible
    let current = Context::current();
    assert_eq!(current.get(), Some(&ValueA(1)));
    assert_eq!(current.get(), Some(&ValueB(42)));

    drop(inner_guard);

    let current = Context::current();
    assert_eq!(current.get::<ValueA>(), None);
    assert_eq!(current.get::<ValueB>(), None);
}

#[test]
fn too_many_contexts() {
    let mut guards: Vec<ContextGuard> = Vec::with_capacity(ContextStack::MAX_POS as usize);
    let stack_max_pos = ContextStack::MAX_POS as u64;
    // Fill the stack up until the last position
    for i in 1..stack_max_pos {
        let cx_guard = Context::current().with_value(ValueB(i)).attach();
        assert_eq!(Context::current().get(), Some(&ValueB(i)));
        assert_eq!(cx_guard.cx_pos, i as u16);
        guards.push(cx_guard);
    }
    // Overflowing attaches are ignored
    for _ in 0..16 {
        let cx_guard = Context::current().with_value(ValueA(1)).attach();
        assert_eq!(cx_guard.cx_pos, ContextStack::MAX_POS);
        assert_eq!(Context::current().get::<ValueA>(), None);
        assert_eq!(Context::current().get(), Some(&ValueB(stack_max_pos - 1)));
        guards.push(cx_guard);
    }
    for _ in 0..16 {
        guards.pop();
        assert_eq!(Context::current().get::<ValueA>(), None);
        assert_eq!(Context::current().get(), Some(&ValueB(stack_max_pos - 1)));
    }
    // Drop one more so we can add a new one
    guards.pop();
    assert_eq!(Context::current().get(), Some(&ValueB(stack_max_pos - 2)));

    let cx_guard = Context::current().with_value(ValueA(2)).attach();
    assert_eq!(cx_guard.cx_pos, ContextStack::MAX_POS - 1);
    assert_eq!(Context::current().get(), Some(&ValueA(2)));
    assert_eq!(Context::current().get(), Some(&ValueB(stack_max_pos - 2)));
    guards.push(cx_guard);
}

#[test]
fn initial_capacity() {
    let stack = ContextStack::default();
    assert_eq!(stack.stack.capacity(), ContextStack::INITIAL_CAPACITY);
}

#[test]
fn pop_id_out_of_order() {
    let mut stack = ContextStack::default();

    let id1 = stack.push(Context::new().with_value(ValueA(1)));
    let id2 = stack.push(Context::new().with_value(ValueA(2)));
    let id3 = stack.push(Context::new().with_value(ValueA(3)));

    // Pop middle context first, the current context stays
    stack.pop_id(id2);
    assert_eq!(stack.current_cx.get::<ValueA>(), Some(&ValueA(3)));
    assert_eq!(stack.stack.len(), 3);

    // Pop last context, restores the previous live one
    stack.pop_id(id3);
    assert_eq!(stack.current_cx.get::<ValueA>(), Some(&ValueA(1)));
    assert_eq!(stack.stack.len(), 1);

    stack.pop_id(id1);
    assert_eq!(stack.current_cx.get::<ValueA>(), None);
    assert_eq!(stack.stack.len(), 0);
}

#[test]
fn pop_id_edge_cases() {
    let mut stack = ContextStack::default();

    stack.pop_id(ContextStack::BASE_POS);
    assert_eq!(stack.stack.len(), 0);

    stack.pop_id(ContextStack::MAX_POS);
    assert_eq!(stack.stack.len(), 0);

    stack.pop_id(1000);
    assert_eq!(stack.stack.len(), 0);

    stack.pop_id(1);
    assert_eq!(stack.stack.len(), 0);
}

/// Parent values reach the async operation, and values added inside do not
/// leak back out.
#[tokio::test]
async fn async_context_propagation() {
    async fn nested_operation() {
        assert_eq!(Context::current().trace(), Some(sample_trace()));

        let child = Trace::new();
        let cx_with_both = Context::current().with_trace(child).with_value(ValueB(24));

        let work = async move {
            assert_eq!(Context::current().trace(), Some(child));
            assert_eq!(Context::current().get::<ValueB>(), Some(&ValueB(24)));

            sleep(Duration::from_millis(10)).await;

            assert_eq!(
                Context::current().trace(),
                Some(child),
                "trace should persist across await points"
            );
            assert_eq!(Context::current().get::<ValueB>(), Some(&ValueB(24)));
        };
        FutureContextExt::with_context(work, cx_with_both).await;
    }

    let parent_cx = Context::new().with_trace(sample_trace());
    FutureContextExt::with_context(nested_operation(), parent_cx.clone()).await;

    assert_eq!(parent_cx.trace(), Some(sample_trace()));
    assert_eq!(parent_cx.get::<ValueB>(), None);
    assert_eq!(Context::current().trace(), None);
    assert_eq!(Context::current().get::<ValueB>(), None);
}

#[tokio::test]
async fn out_of_order_context_detachment_futures() {
    // Returns a future without awaiting it, so it completes before the future
    // it creates.
    async fn create_a_future() -> impl std::future::Future<Output = ()> {
        FutureContextExt::with_current_context(async {
            assert_eq!(Context::current().get::<ValueA>(), Some(&ValueA(42)));
            sleep(Duration::from_millis(50)).await;
        })
    }

    let parent_cx = Context::new().with_value(ValueA(42));
    let future = FutureContextExt::with_context(create_a_future(), parent_cx).await;
    future.await;

    assert_eq!(Context::current().get::<ValueA>(), None);
    assert_eq!(Context::current().get::<ValueB>(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn context_follows_task_across_threads() {
    let traces: Vec<Trace> = (0..8).map(|_| Trace::new()).collect();

    let handles = traces
        .iter()
        .map(|trace| {
            let trace = *trace;
            let work = async move {
                for _ in 0..5 {
                    assert_eq!(Context::current().trace(), Some(trace));
                    tokio::task::yield_now().await;
                }
                Context::current().trace()
            };
            tokio::spawn(FutureContextExt::with_context(
                work,
                Context::new().with_trace(trace),
            ))
        })
        .collect::<Vec<_>>();

    for (handle, trace) in handles.into_iter().zip(traces) {
        assert_eq!(handle.await.unwrap(), Some(trace));
    }
}

#[tokio::test]
async fn stream_with_context() {
    let cx = Context::new().with_trace(sample_trace());
    let traces = stream::iter(0..3).map(|_| Context::current().trace());
    let seen: Vec<Option<Trace>> = StreamContextExt::with_context(traces, cx)
        .collect()
        .await;

    assert_eq!(seen, vec![Some(sample_trace()); 3]);
    assert_eq!(Context::current().trace(), None);
}

#[test]
fn with_context_exposes_context() {
    let cx = Context::new().with_value(ValueA(3));
    let future = FutureContextExt::with_context(std::future::ready(()), cx);
    assert_eq!(future.context().get::<ValueA>(), Some(&ValueA(3)));
}
