use console::{style, Term};

/// Observer for long-running batch work. Purely cosmetic.
pub trait Progress {
    fn tick(&mut self);

    fn finish(&mut self) {}
}

impl<P: Progress + ?Sized> Progress for Box<P> {
    fn tick(&mut self) {
        (**self).tick();
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Discards all ticks.
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self) {}
}

/// Single-line counter redrawn on stderr.
pub struct ConsoleProgress {
    term: Term,
    title: String,
    total: u64,
    done: u64,
}

impl ConsoleProgress {
    pub fn new(title: impl Into<String>, total: u64) -> Self {
        Self {
            term: Term::stderr(),
            title: title.into(),
            total,
            done: 0,
        }
    }

    fn render(&self) -> String {
        let pct = if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        };
        format!(
            "{} {}/{} ({}%)",
            style(&self.title).bold(),
            self.done,
            self.total,
            pct
        )
    }

    fn redraw(&self) {
        // Drawing failures must not affect the run.
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&self.render());
    }
}

impl Progress for ConsoleProgress {
    fn tick(&mut self) {
        self.done = (self.done + 1).min(self.total);
        if self.term.is_term() {
            self.redraw();
        }
    }

    fn finish(&mut self) {
        if self.term.is_term() {
            self.redraw();
            let _ = self.term.write_line("");
        }
    }
}
