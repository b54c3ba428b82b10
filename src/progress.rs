use log::info;

/// Coarse progress reporting for multi-step operations.
pub trait Progress {
    fn begin(&mut self, _total: usize) {}

    fn step(&mut self, label: &str);
}

/// Ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
    fn step(&mut self, _label: &str) {}
}

/// Reports each step through the logger.
#[derive(Debug, Default)]
pub struct Logged {
    done: usize,
    total: usize,
}

impl Progress for Logged {
    fn begin(&mut self, total: usize) {
        self.done = 0;
        self.total = total;
    }

    fn step(&mut self, label: &str) {
        self.done += 1;
        info!("[{}/{}] {}", self.done, self.total, label);
    }
}

impl<F: FnMut(&str)> Progress for F {
    fn step(&mut self, label: &str) {
        self(label)
    }
}
