use payload_abi::{EntryParams, ExitStatus, ParameterBlock};
use payload_console::{ConsoleBackend, ConsoleResource, ConsoleState};
use payload_entry::{DEFAULT_MARKER, invoke};
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Allocate,
    Write(String),
    Read,
}

/// A console operated by a script: canned allocation outcome, canned input,
/// and a log of every call in order.
struct Operator {
    allocation: ConsoleState,
    refusals: Mutex<usize>,
    fail_writes: bool,
    input: Mutex<VecDeque<io::Result<&'static str>>>,
    events: Mutex<Vec<Event>>,
}

impl Operator {
    fn typing(lines: &[&'static str]) -> Self {
        Self {
            allocation: ConsoleState::Allocated,
            refusals: Mutex::new(0),
            fail_writes: false,
            input: Mutex::new(lines.iter().copied().map(Ok).collect()),
            events: Mutex::default(),
        }
    }

    fn with_allocation(mut self, allocation: ConsoleState) -> Self {
        self.allocation = allocation;
        self
    }

    /// Refuse the first `times` allocations before granting the configured one.
    fn refusing(self, times: usize) -> Self {
        *self.refusals.lock().unwrap() = times;
        self
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl ConsoleBackend for Operator {
    fn allocate(&self) -> ConsoleState {
        self.events.lock().unwrap().push(Event::Allocate);
        let mut refusals = self.refusals.lock().unwrap();
        if *refusals > 0 {
            *refusals -= 1;
            return ConsoleState::Unavailable { code: 5 };
        }
        self.allocation
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        self.events.lock().unwrap().push(Event::Write(line.to_owned()));
        if self.fail_writes {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "console gone"))
        } else {
            Ok(())
        }
    }

    fn read_line(&self, buf: &mut String) -> io::Result<usize> {
        self.events.lock().unwrap().push(Event::Read);
        // An exhausted script behaves like closed input.
        let line = self.input.lock().unwrap().pop_front().unwrap_or(Ok(""))?;
        buf.push_str(line);
        Ok(line.len())
    }
}

fn marker() -> Event {
    Event::Write(DEFAULT_MARKER.to_owned())
}

fn encode(params: &EntryParams<'_>) -> Vec<u8> {
    let mut buf = vec![0u8; params.encoded_len()];
    params.encode_into(&mut buf).unwrap();
    buf
}

#[test]
fn null_block_runs_full_handshake() {
    let console = ConsoleResource::new(Operator::typing(&["x\n"]));
    let block = unsafe { ParameterBlock::from_raw(std::ptr::null(), 0) };

    let status = invoke(&console, block);

    assert_eq!(status.code(), 42);
    assert_eq!(
        console.backend().events(),
        vec![Event::Allocate, marker(), Event::Read]
    );
}

#[test]
fn marker_is_written_before_waiting() {
    let console = ConsoleResource::new(Operator::typing(&["\n"]));
    let _ = invoke(&console, ParameterBlock::absent());

    let events = console.backend().events();
    let write = events.iter().position(|e| matches!(e, Event::Write(_)));
    let read = events.iter().position(|e| *e == Event::Read);
    assert!(write.unwrap() < read.unwrap(), "write-then-wait, got {events:?}");
}

#[test]
fn status_does_not_depend_on_input() {
    for line in ["x\n", "\n", "anything at all\n", "   \r\n", "no newline at eof"] {
        let console = ConsoleResource::new(Operator::typing(&[line]));
        assert_eq!(
            invoke(&console, ParameterBlock::absent()),
            ExitStatus::HANDSHAKE_COMPLETE,
            "input {line:?}"
        );
    }
}

#[test]
fn invoking_twice_reuses_the_console() {
    let console = ConsoleResource::new(Operator::typing(&["first\n", "second\n"]));

    assert_eq!(invoke(&console, ParameterBlock::absent()).code(), 42);
    assert_eq!(invoke(&console, ParameterBlock::absent()).code(), 42);

    assert_eq!(
        console.backend().events(),
        vec![Event::Allocate, marker(), Event::Read, marker(), Event::Read]
    );
    assert_eq!(console.allocations(), 1);
}

#[test]
fn already_attached_console_is_not_a_failure() {
    let console = ConsoleResource::new(
        Operator::typing(&["\n"]).with_allocation(ConsoleState::AlreadyAttached),
    );
    assert_eq!(invoke(&console, ParameterBlock::absent()).code(), 42);
    assert_eq!(console.backend().events().len(), 3);
}

#[test]
fn missing_console_proceeds_by_default() {
    let console = ConsoleResource::new(
        Operator::typing(&["\n"]).with_allocation(ConsoleState::Unavailable { code: 5 }),
    );
    assert_eq!(invoke(&console, ParameterBlock::absent()).code(), 42);
    assert_eq!(
        console.backend().events(),
        vec![Event::Allocate, marker(), Event::Read]
    );
}

#[test]
fn missing_console_aborts_when_asked() {
    let blob = encode(&EntryParams {
        abort_without_console: true,
        ..EntryParams::default()
    });
    let console = ConsoleResource::new(
        Operator::typing(&["\n"]).with_allocation(ConsoleState::Unavailable { code: 5 }),
    );

    let status = invoke(&console, ParameterBlock::from_bytes(&blob));

    assert_eq!(status, ExitStatus::CONSOLE_UNAVAILABLE);
    assert_eq!(console.backend().events(), vec![Event::Allocate]);
}

#[test]
fn refused_console_is_requested_again_on_next_invoke() {
    let blob = encode(&EntryParams {
        abort_without_console: true,
        ..EntryParams::default()
    });
    let console = ConsoleResource::new(Operator::typing(&["\n"]).refusing(1));

    let first = invoke(&console, ParameterBlock::from_bytes(&blob));
    let second = invoke(&console, ParameterBlock::from_bytes(&blob));

    assert_eq!(first, ExitStatus::CONSOLE_UNAVAILABLE);
    assert_eq!(second, ExitStatus::HANDSHAKE_COMPLETE);
    assert_eq!(
        console.backend().events(),
        vec![Event::Allocate, Event::Allocate, marker(), Event::Read]
    );
    assert_eq!(console.allocations(), 2);
}

#[test]
fn abort_policy_is_irrelevant_with_a_console() {
    let blob = encode(&EntryParams {
        abort_without_console: true,
        ..EntryParams::default()
    });
    let console = ConsoleResource::new(Operator::typing(&["\n"]));
    assert_eq!(invoke(&console, ParameterBlock::from_bytes(&blob)).code(), 42);
}

#[test]
fn parameter_block_overrides_marker_and_status() {
    let blob = encode(&EntryParams {
        exit_status: Some(ExitStatus::new(1234)),
        marker: Some("payload resident"),
        abort_without_console: false,
    });
    let size = i32::try_from(blob.len()).unwrap();
    let block = unsafe { ParameterBlock::from_raw(blob.as_ptr().cast(), size) };
    let console = ConsoleResource::new(Operator::typing(&["ok\n"]));

    assert_eq!(invoke(&console, block).code(), 1234);
    assert_eq!(
        console.backend().events(),
        vec![
            Event::Allocate,
            Event::Write("payload resident".to_owned()),
            Event::Read
        ]
    );
}

#[test]
fn malformed_block_is_treated_as_absent() {
    let mut blob = encode(&EntryParams {
        marker: Some("never shown"),
        ..EntryParams::default()
    });
    blob.truncate(blob.len() - 3);
    let console = ConsoleResource::new(Operator::typing(&["\n"]));

    assert_eq!(invoke(&console, ParameterBlock::from_bytes(&blob)).code(), 42);
    assert_eq!(console.backend().events()[1], marker());
}

#[test]
fn failed_marker_write_still_waits() {
    let mut operator = Operator::typing(&["\n"]);
    operator.fail_writes = true;
    let console = ConsoleResource::new(operator);

    assert_eq!(invoke(&console, ParameterBlock::absent()).code(), 42);
    assert_eq!(
        console.backend().events(),
        vec![Event::Allocate, marker(), Event::Read]
    );
}

#[test]
fn closed_or_broken_input_still_returns_status() {
    let closed = ConsoleResource::new(Operator::typing(&[]));
    assert_eq!(invoke(&closed, ParameterBlock::absent()).code(), 42);

    let broken = Operator::typing(&[]);
    broken
        .input
        .lock()
        .unwrap()
        .push_back(Err(io::Error::other("read failed")));
    let broken = ConsoleResource::new(broken);
    assert_eq!(invoke(&broken, ParameterBlock::absent()).code(), 42);
}
