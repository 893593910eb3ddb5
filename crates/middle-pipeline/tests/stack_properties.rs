//! Property tests for stack ordering and immutability.

use std::sync::Arc;

use bytes::Bytes;
use middle_core::{Request, Response};
use middle_pipeline::{ApplicationStack, FnMiddleware, SharedMiddleware};
use parking_lot::Mutex;
use proptest::prelude::*;

type Trace = Arc<Mutex<Vec<usize>>>;

fn recorder(id: usize, trace: &Trace) -> SharedMiddleware {
    let trace = Arc::clone(trace);
    FnMiddleware::new("recorder", move |request: Request, handler| {
        trace.lock().push(id);
        handler.handle(request)
    })
    .into()
}

fn terminal() -> SharedMiddleware {
    FnMiddleware::new("terminal", |_request, _handler| {
        Ok(Response::new(Bytes::from_static(b"done")))
    })
    .into()
}

fn run(stack: &ApplicationStack, trace: &Trace) -> Vec<usize> {
    trace.lock().clear();
    stack.process(Request::new(Bytes::new())).unwrap();
    trace.lock().clone()
}

proptest! {
    #[test]
    fn test_last_added_runs_first(count in 0usize..12) {
        let trace = Trace::default();
        let stack = (0..count).fold(ApplicationStack::new([terminal()]), |stack, id| {
            stack.with_middleware(recorder(id, &trace))
        });

        let expected: Vec<usize> = (0..count).rev().collect();
        prop_assert_eq!(run(&stack, &trace), expected);
    }

    #[test]
    fn test_constructor_arguments_run_in_reverse(count in 0usize..12) {
        let trace = Trace::default();
        let middlewares = std::iter::once(terminal())
            .chain((0..count).map(|id| recorder(id, &trace)));
        let stack = ApplicationStack::new(middlewares);

        let expected: Vec<usize> = (0..count).rev().collect();
        prop_assert_eq!(run(&stack, &trace), expected);
    }

    #[test]
    fn test_derived_stacks_never_change_their_source(
        base in 0usize..6,
        added in 0usize..6,
        removed in 0usize..6,
    ) {
        let trace = Trace::default();
        let members: Vec<SharedMiddleware> = (0..base).map(|id| recorder(id, &trace)).collect();
        let original = ApplicationStack::new(std::iter::once(terminal()).chain(members.clone()));
        let before = run(&original, &trace);

        let mut derived = original.clone();
        for id in 0..added {
            derived = derived.with_middleware(recorder(base + id, &trace));
        }
        for member in members.iter().take(removed) {
            derived = derived.without_middleware(member);
        }

        prop_assert_eq!(original.len(), base + 1);
        prop_assert_eq!(derived.len(), base + 1 + added - removed.min(base));
        prop_assert_eq!(run(&original, &trace), before);
    }
}
