//! Property tests: structural invariants of the binding engine under
//! arbitrary interleavings of renders, emissions, settlements, and
//! disconnects.
//!
//! A reference model tracks what the engine state must look like after each
//! operation; every step cross-checks:
//! 1. Binding existence matches outstanding async work.
//! 2. Stream subscription counts match the feeds' observer counts.
//! 3. Re-render requests are counted exactly (one per completion that lands
//!    in a live binding).
//! 4. Every read observes the model's expected value: the latest emission
//!    for live stream entries, the settled value for cached one-shots,
//!    pending otherwise.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use proptest::prelude::*;

use tether_core::{Deferred, Feed};
use tether_runtime::testing::StubHost;
use tether_runtime::{Binder, HookSlots};

const FEEDS: usize = 3;
const ONE_SHOTS: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    /// Drive one render pass reading the selected sources.
    Render {
        feeds: [bool; FEEDS],
        one_shots: [bool; ONE_SHOTS],
    },
    /// Emit the next value on one feed.
    Emit(usize),
    /// Settle one deferred (idempotent at the primitive level).
    Settle(usize),
    /// Run the component's disconnect hook.
    Disconnect,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<[bool; FEEDS]>(), any::<[bool; ONE_SHOTS]>())
            .prop_map(|(feeds, one_shots)| Op::Render { feeds, one_shots }),
        3 => (0..FEEDS).prop_map(Op::Emit),
        2 => (0..ONE_SHOTS).prop_map(Op::Settle),
        1 => Just(Op::Disconnect),
    ]
}

/// Model of one deferred's cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OneShotEntry {
    Absent,
    Pending,
    Valued(u32),
}

/// Reference model of the engine state for one component.
#[derive(Debug)]
struct Model {
    bound: bool,
    /// Feeds with a live stream entry.
    streams: BTreeSet<usize>,
    /// Cached last emission per live stream entry.
    stream_last: [Option<u32>; FEEDS],
    /// Deferred cache entries.
    one_shots: [OneShotEntry; ONE_SHOTS],
    /// Whether each deferred has settled (primitive-level state).
    settled: [Option<u32>; ONE_SHOTS],
    /// Expected total re-render requests.
    rerenders: usize,
}

impl Model {
    fn new() -> Self {
        Self {
            bound: false,
            streams: BTreeSet::new(),
            stream_last: [None; FEEDS],
            one_shots: [OneShotEntry::Absent; ONE_SHOTS],
            settled: [None; ONE_SHOTS],
            rerenders: 0,
        }
    }

    fn tracked_one_shots(&self) -> usize {
        self.one_shots
            .iter()
            .filter(|entry| **entry != OneShotEntry::Absent)
            .count()
    }

    fn unbind(&mut self) {
        self.bound = false;
        self.streams.clear();
        self.stream_last = [None; FEEDS];
        self.one_shots = [OneShotEntry::Absent; ONE_SHOTS];
    }

    /// Apply one render pass and return the reads it must observe, in read
    /// order (feeds first, then one-shots).
    fn render(&mut self, feeds: [bool; FEEDS], one_shots: [bool; ONE_SHOTS]) -> Vec<Option<u32>> {
        let mut observed = Vec::new();

        // Reads see the entry state at read time: kept entries their cache,
        // fresh stream entries nothing (feeds do not replay), fresh one-shot
        // entries the settled value (the continuation attaches and fires
        // synchronously).
        for i in 0..FEEDS {
            if !feeds[i] {
                continue;
            }
            if self.bound && self.streams.contains(&i) {
                observed.push(self.stream_last[i]);
            } else {
                observed.push(None);
                self.stream_last[i] = None;
            }
        }
        for j in 0..ONE_SHOTS {
            if !one_shots[j] {
                continue;
            }
            let entry = if self.bound {
                self.one_shots[j]
            } else {
                OneShotEntry::Absent
            };
            match entry {
                OneShotEntry::Valued(value) => observed.push(Some(value)),
                OneShotEntry::Pending => observed.push(None),
                OneShotEntry::Absent => match self.settled[j] {
                    Some(value) => {
                        observed.push(Some(value));
                        self.rerenders += 1;
                    }
                    None => observed.push(None),
                },
            }
        }

        let selected_feeds: BTreeSet<usize> = (0..FEEDS).filter(|i| feeds[*i]).collect();
        let read_anything = !selected_feeds.is_empty() || one_shots.iter().any(|read| *read);

        if self.bound {
            // Wrapped pass: entries update, then the reaper prunes.
            for j in 0..ONE_SHOTS {
                if one_shots[j] && self.one_shots[j] == OneShotEntry::Absent {
                    self.one_shots[j] = match self.settled[j] {
                        Some(value) => OneShotEntry::Valued(value),
                        None => OneShotEntry::Pending,
                    };
                }
            }
            for i in 0..FEEDS {
                if !selected_feeds.contains(&i) {
                    self.stream_last[i] = None;
                }
            }
            self.streams = selected_feeds;
            if self.streams.is_empty() && self.tracked_one_shots() == 0 {
                self.unbind();
            }
        } else if read_anything {
            // Binding-creating pass: the decorated render (and with it the
            // reaper) only takes over from the next pass on.
            self.bound = true;
            self.streams = selected_feeds;
            for j in 0..ONE_SHOTS {
                if one_shots[j] {
                    self.one_shots[j] = match self.settled[j] {
                        Some(value) => OneShotEntry::Valued(value),
                        None => OneShotEntry::Pending,
                    };
                }
            }
        }

        observed
    }

    fn emit(&mut self, feed: usize, value: u32) {
        if self.bound && self.streams.contains(&feed) {
            self.stream_last[feed] = Some(value);
            self.rerenders += 1;
        }
    }

    fn settle(&mut self, one_shot: usize, value: u32) {
        if self.settled[one_shot].is_some() {
            return;
        }
        self.settled[one_shot] = Some(value);
        if self.bound && self.one_shots[one_shot] == OneShotEntry::Pending {
            self.one_shots[one_shot] = OneShotEntry::Valued(value);
            self.rerenders += 1;
        }
    }

    fn disconnect(&mut self) {
        if self.bound {
            self.unbind();
        }
    }
}

proptest! {
    #[test]
    fn engine_state_matches_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let host: Rc<StubHost<()>> = StubHost::new();
        let binder: Binder<()> = Binder::new(host.clone());

        let feeds: Vec<Feed<u32>> = (0..FEEDS).map(|_| Feed::new()).collect();
        let one_shots: Vec<Deferred<u32>> = (0..ONE_SHOTS).map(|_| Deferred::new()).collect();

        // The render plan and observation log shared with the render hook.
        let plan: Rc<RefCell<([bool; FEEDS], [bool; ONE_SHOTS])>> =
            Rc::new(RefCell::new(([false; FEEDS], [false; ONE_SHOTS])));
        let observed: Rc<RefCell<Vec<Option<u32>>>> = Rc::new(RefCell::new(Vec::new()));

        let slots = HookSlots::new().with_render({
            let binder = binder.clone();
            let feeds = feeds.clone();
            let one_shots = one_shots.clone();
            let plan = Rc::clone(&plan);
            let observed = Rc::clone(&observed);
            move || {
                let (read_feeds, read_one_shots) = *plan.borrow();
                let mut log = Vec::new();
                for (feed, read) in feeds.iter().zip(read_feeds) {
                    if read {
                        log.push(binder.read_as::<u32>(feed).ready().map(|value| *value));
                    }
                }
                for (one_shot, read) in one_shots.iter().zip(read_one_shots) {
                    if read {
                        log.push(binder.read_as::<u32>(one_shot).ready().map(|value| *value));
                    }
                }
                *observed.borrow_mut() = log;
            }
        });
        let component = host.add_component(slots);

        let mut model = Model::new();
        let mut next_value = 0u32;

        for op in ops {
            match op {
                Op::Render { feeds: f, one_shots: o } => {
                    *plan.borrow_mut() = (f, o);
                    observed.borrow_mut().clear();
                    host.render(component);
                    let expected = model.render(f, o);
                    prop_assert_eq!(&*observed.borrow(), &expected);
                }
                Op::Emit(feed) => {
                    next_value += 1;
                    feeds[feed].emit(next_value);
                    model.emit(feed, next_value);
                }
                Op::Settle(one_shot) => {
                    next_value += 1;
                    one_shots[one_shot].settle(next_value);
                    model.settle(one_shot, next_value);
                }
                Op::Disconnect => {
                    host.disconnect(component);
                    model.disconnect();
                }
            }

            // Structural invariants after every operation.
            prop_assert_eq!(binder.is_bound(component), model.bound);
            prop_assert_eq!(binder.stream_count(component), model.streams.len());
            prop_assert_eq!(binder.one_shot_count(component), model.tracked_one_shots());
            for (i, feed) in feeds.iter().enumerate() {
                let expected = usize::from(model.streams.contains(&i));
                prop_assert_eq!(feed.observer_count(), expected);
            }
            prop_assert_eq!(host.rerender_count(component), model.rerenders);
        }
    }
}
