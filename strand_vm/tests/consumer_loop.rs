//! Integration tests for the consumer loop and the task drivers.
//!
//! # Test Categories
//!
//! - **Loop Construct**: iterable objects, infinite sequences, early exit
//! - **Resource Release**: cleanup on break for sequences and generators
//! - **Fibers**: straight-line bodies consumed by the same loops
//! - **Drivers**: thunk-style runners and the round-robin scheduler

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use std::rc::Rc;

use strand_vm::{
    Abrupt, Generator, GeneratorError, LoopExit, Resume, Scheduler, Sequence, Step, Suspend,
    for_each, for_of, run, sequence_from_fn, spread,
};

// =============================================================================
// Loop Construct
// =============================================================================

#[test]
fn test_iterable_object_spreads() {
    // myIterable[Symbol.iterator] = function* () { yield 1; yield 2; yield 3 }
    let my_iterable = || {
        let mut n = 0;
        Generator::<'static, i32, ()>::from_fn(move |resume| {
            resume.into_input()?;
            n += 1;
            Ok(if n <= 3 {
                Suspend::Yield(n)
            } else {
                Suspend::done()
            })
        })
    };
    assert_eq!(spread(&mut my_iterable()), Ok(vec![1, 2, 3]));
    // Each call produces an independent traversal.
    assert_eq!(spread(&mut my_iterable()), Ok(vec![1, 2, 3]));
}

#[test]
fn test_infinite_fibonacci_with_break() {
    let mut pair = (0u64, 1u64);
    let mut fib = Generator::<'static, u64, ()>::from_fn(move |resume| {
        resume.into_input()?;
        let current = pair.0;
        pair = (pair.1, pair.0 + pair.1);
        Ok(Suspend::Yield(current))
    });

    let mut seen = Vec::new();
    let exit = for_each(&mut fib, |n| {
        if n > 1000 {
            return ControlFlow::Break(());
        }
        seen.push(n);
        ControlFlow::Continue(())
    });
    assert_eq!(exit, Ok(LoopExit::Broken));
    assert_eq!(seen.last(), Some(&987));
    assert_eq!(seen.len(), 17);
    assert!(fib.is_completed());
}

#[test]
fn test_completion_value_is_not_bound() {
    // for (let v of g()) {} never sees 'ending'
    let mut pc = 0;
    let g: Generator<'_, &'static str, ()> = Generator::from_fn(move |resume| {
        resume.into_input()?;
        pc += 1;
        Ok(match pc {
            1 => Suspend::Yield("hello"),
            _ => Suspend::Complete(Some("ending")),
        })
    });
    let mut lp = for_of(g);
    assert_eq!(lp.by_ref().collect::<Vec<_>>(), vec![Ok("hello")]);
    assert_eq!(lp.completion(), Some(&"ending"));
}

#[test]
fn test_entries_of_a_map() {
    // function* iterEntries(obj) { for (key of Object.keys(obj)) yield [key, obj[key]] }
    let obj: BTreeMap<&str, i32> = [("foo", 3), ("bar", 7)].into_iter().collect();
    let mut entries = Sequence::new(obj.iter().map(|(k, v)| (*k, *v)));
    let mut lines = Vec::new();
    let exit: Result<_, GeneratorError<()>> = for_each(&mut entries, |(key, value)| {
        lines.push(format!("{key} -> {value}"));
        ControlFlow::Continue(())
    });
    assert_eq!(exit, Ok(LoopExit::Exhausted(None)));
    assert_eq!(lines, vec!["bar -> 7", "foo -> 3"]);
}

#[test]
fn test_loop_body_error_with_question_mark() {
    fn sum_all(g: Generator<'_, i32, String>) -> Result<i32, GeneratorError<String>> {
        let mut total = 0;
        for value in g {
            total += value?;
        }
        Ok(total)
    }

    let mut pc = 0;
    let bad: Generator<'_, i32, String> = Generator::from_fn(move |resume| {
        resume.into_input()?;
        pc += 1;
        if pc < 3 {
            Ok(Suspend::Yield(pc))
        } else {
            Err(Abrupt::throw("parse error on line 3".to_string()))
        }
    });
    assert_eq!(
        sum_all(bad),
        Err(GeneratorError::PropagatedBody(
            "parse error on line 3".to_string()
        ))
    );
}

// =============================================================================
// Resource Release
// =============================================================================

/// A line reader that records when it is closed.
struct FileReader {
    lines: std::vec::IntoIter<&'static str>,
    closed: Rc<Cell<bool>>,
}

impl Iterator for FileReader {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.lines.next().and_then(|line| line.parse().ok())
    }
}

impl Drop for FileReader {
    fn drop(&mut self) {
        self.closed.set(true);
    }
}

fn open(contents: Vec<&'static str>) -> (FileReader, Rc<Cell<bool>>) {
    let closed = Rc::new(Cell::new(false));
    let reader = FileReader {
        lines: contents.into_iter(),
        closed: Rc::clone(&closed),
    };
    (reader, closed)
}

#[test]
fn test_break_closes_underlying_file() {
    let (reader, closed) = open(vec!["1", "2", "3", "4"]);
    let mut numbers = Sequence::new(reader);
    let mut seen = Vec::new();
    let exit: Result<_, GeneratorError<()>> = for_each(&mut numbers, |n| {
        seen.push(n);
        if n == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(exit, Ok(LoopExit::Broken));
    assert_eq!(seen, vec![1, 2]);
    // Released at the break, while the sequence itself is still alive.
    assert!(closed.get());
    assert!(!numbers.is_open());
}

#[test]
fn test_generator_finally_closes_file() {
    // function* numbers() { let file = open(); try { while (!eof) yield line } finally { file.close() } }
    let (reader, closed) = open(vec!["10", "20", "30"]);
    let mut file = Some(reader);
    let numbers: Generator<'_, i32, ()> = Generator::from_fn(move |resume| {
        if let Err(abrupt) = resume.into_input() {
            file = None;
            return Err(abrupt);
        }
        match file.as_mut().and_then(Iterator::next) {
            Some(n) => Ok(Suspend::Yield(n)),
            None => {
                file = None;
                Ok(Suspend::done())
            }
        }
    });
    let first: Vec<i32> = (&numbers)
        .into_iter()
        .take(1)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first, vec![10]);
    assert!(closed.get());
    assert!(numbers.is_completed());
}

#[test]
fn test_exhausted_sequence_from_fn_releases_state() {
    let mut remaining = 2;
    let mut countdown = sequence_from_fn(move || {
        remaining -= 1;
        (remaining >= 0).then_some(remaining)
    });
    let values: Result<Vec<i32>, GeneratorError<()>> = spread(&mut countdown);
    assert_eq!(values, Ok(vec![1, 0]));
    assert!(!countdown.is_open());
}

// =============================================================================
// Fibers
// =============================================================================

#[test]
fn test_fiber_numbers_with_finally() {
    let g: Generator<'_, i32, String> = Generator::fiber(|co| {
        co.suspend(1)?;
        let guarded: Result<(), Abrupt<i32, String>> = (|| {
            co.suspend(2)?;
            co.suspend(3)?;
            Ok(())
        })();
        co.suspend(4)?;
        co.suspend(5)?;
        guarded?;
        co.suspend(6)?;
        Ok(None)
    });
    assert_eq!(g.next(), Ok(Step::yielded(1)));
    assert_eq!(g.next(), Ok(Step::yielded(2)));
    assert_eq!(g.force_return(Some(7)), Ok(Step::yielded(4)));
    assert_eq!(g.next(), Ok(Step::yielded(5)));
    assert_eq!(g.next(), Ok(Step::complete(Some(7))));
    assert_eq!(g.next(), Ok(Step::exhausted()));
}

#[test]
fn test_fiber_break_runs_cleanup() {
    let cleaned = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&cleaned);
    let g: Generator<'_, u32, ()> = Generator::fiber(move |co| {
        let result = co.suspend_all(0..);
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        result?;
        Ok(None)
    });
    let firsts: Vec<u32> = g.into_iter().take(3).map(Result::unwrap).collect();
    assert_eq!(firsts, vec![0, 1, 2]);
    assert!(cleaned.load(std::sync::atomic::Ordering::SeqCst));
}

// =============================================================================
// Drivers
// =============================================================================

fn read_file(disk: &HashMap<&'static str, &'static str>, name: String) -> Result<String, String> {
    disk.get(name.as_str())
        .map(|contents| contents.to_string())
        .ok_or_else(|| format!("ENOENT: {name}"))
}

#[test]
fn test_thunk_runner_reads_files_in_order() {
    // var f1 = yield readFile('fileA'); var f2 = yield readFile('fileB'); return f1 + f2
    let disk: HashMap<_, _> = [("fileA", "alpha"), ("fileB", "beta")].into_iter().collect();
    let mut pc = 0;
    let mut contents = Vec::new();
    let mut g: Generator<'_, String, String> = Generator::from_fn(move |resume| {
        let input = resume.into_input()?;
        contents.extend(input);
        pc += 1;
        Ok(match pc {
            1 => Suspend::Yield("fileA".to_string()),
            2 => Suspend::Yield("fileB".to_string()),
            _ => Suspend::Complete(Some(contents.join("+"))),
        })
    });
    let result = run(&mut g, |name| read_file(&disk, name));
    assert_eq!(result, Ok(Some("alpha+beta".to_string())));
}

#[test]
fn test_long_running_task_catches_failed_step() {
    // try { v2 = yield step1(v1); v3 = yield step2(v2); ... } catch (e) { handled = e }
    let handled = RefCell::new(None);
    let mut steps = 0;
    let mut task: Generator<'_, i32, String> = Generator::from_fn(|resume| {
        let value = match resume {
            Resume::Throw(e) => {
                *handled.borrow_mut() = Some(e);
                return Ok(Suspend::Complete(Some(-1)));
            }
            other => other.into_input()?.unwrap_or(1),
        };
        steps += 1;
        Ok(if steps <= 4 {
            Suspend::Yield(value)
        } else {
            Suspend::Complete(Some(value))
        })
    });
    let result = run(&mut task, |v| {
        if v >= 3 {
            Err(format!("step failed at {v}"))
        } else {
            Ok(v + 1)
        }
    });
    assert_eq!(result, Ok(Some(-1)));
    assert_eq!(handled.borrow().as_deref(), Some("step failed at 3"));
}

#[test]
fn test_scheduler_interleaves_readers() {
    let disk: HashMap<_, _> = [("a1", "A1"), ("a2", "A2"), ("b1", "B1")].into_iter().collect();
    let order = RefCell::new(Vec::new());

    let reader = |files: Vec<&'static str>| {
        let order = &order;
        let mut pc = 0;
        Generator::<'_, String, String>::from_fn(move |resume| {
            if let Some(contents) = resume.into_input()? {
                order.borrow_mut().push(contents);
            }
            let step = match files.get(pc) {
                Some(file) => Suspend::Yield(file.to_string()),
                None => Suspend::Complete(Some(format!("{} files", files.len()))),
            };
            pc += 1;
            Ok(step)
        })
    };

    let mut scheduler = Scheduler::new();
    let a = scheduler.spawn(reader(vec!["a1", "a2"]));
    let b = scheduler.spawn(reader(vec!["b1", "missing"]));
    let outcomes = scheduler.run_until_complete(|name| read_file(&disk, name));

    assert_eq!(*order.borrow(), vec!["A1", "B1", "A2"]);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].id, a);
    assert_eq!(outcomes[0].result, Ok(Some("2 files".to_string())));
    assert_eq!(outcomes[1].id, b);
    assert_eq!(
        outcomes[1].result,
        Err(GeneratorError::UnhandledInjected("ENOENT: missing".to_string()))
    );
}
