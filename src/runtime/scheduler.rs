use crate::runtime::{fault::Fault, process::ProcessId, system::System};

/// What a [`Scheduler::run_to_completion`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Full passes over the schedule.
    pub rounds: usize,
    /// Process steps handed out.
    pub quanta: usize,
    /// Finished processes removed from the table.
    pub reaped: usize,
    /// Garbage collections triggered by `collect_every`.
    pub collections: usize,
}

/// Round-robin scheduler over a singly linked list of processes.
///
/// The list threads through [`Process::next`]; `SPAWN` splices new processes
/// in right after their parent, so they run later in the same round.
///
/// [`Process::next`]: crate::runtime::process::Process::next
pub struct Scheduler {
    head: Option<ProcessId>,
}

impl Scheduler {
    pub fn new(head: ProcessId) -> Self {
        Self { head: Some(head) }
    }

    pub fn head(&self) -> Option<ProcessId> {
        self.head
    }

    /// Runs every scheduled process, one step at a time, until all are done.
    ///
    /// After each step the finished processes directly behind the one that
    /// ran are unlinked and dropped; finished processes at the head are
    /// dropped when the walk wraps around. A fault from any process stops
    /// the run.
    pub fn run_to_completion(&mut self, sys: &mut System) -> Result<RunReport, Fault> {
        let mut report = RunReport::default();
        let mut current = self.head;

        while self.head.is_some() {
            let Some(curr) = current else {
                break;
            };
            if sys.config.trace {
                eprintln!(
                    "[sched] run process {} ({})",
                    curr.index(),
                    sys.processes.get(curr)?.kind()
                );
            }
            sys.run_process(curr)?;
            report.quanta += 1;

            let mut next = sys.processes.get(curr)?.next;
            while let Some(candidate) = next {
                let process = sys.processes.get(candidate)?;
                if !process.done {
                    break;
                }
                let after = process.next;
                sys.processes.get_mut(curr)?.next = after;
                sys.processes.remove(candidate);
                report.reaped += 1;
                next = after;
            }

            current = next;
            if current.is_none() {
                while let Some(first) = self.head {
                    let process = sys.processes.get(first)?;
                    if !process.done {
                        break;
                    }
                    self.head = process.next;
                    sys.processes.remove(first);
                    report.reaped += 1;
                }
                current = self.head;
                report.rounds += 1;
                self.maybe_collect(sys, &mut report);
            }
        }

        if sys.config.verbose {
            eprintln!(
                "[sched] {} rounds, {} quanta, {} processes reaped, {} collections",
                report.rounds, report.quanta, report.reaped, report.collections
            );
        }
        Ok(report)
    }

    fn maybe_collect(&self, sys: &mut System, report: &mut RunReport) {
        let Some(every) = sys.config.collect_every else {
            return;
        };
        if every == 0 || report.rounds % every as usize != 0 {
            return;
        }
        let closed = sys.collect_garbage(&[]);
        report.collections += 1;
        if sys.config.verbose {
            eprintln!(
                "[gc] round {}: freed {}, live {}, closed {} file process(es)",
                report.rounds,
                sys.heap.last_freed(),
                sys.heap.live_count(),
                closed
            );
        }
    }
}
