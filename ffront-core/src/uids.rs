#![forbid(unsafe_code)]

/// Sequential name generator. Names are unique per generator only, so a
/// new one is created for every synthesis that needs fresh symbols.
#[derive(Clone, Debug)]
pub struct UidGenerator {
    prefix: String,
    next: u32,
}

impl UidGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn fresh(&mut self) -> String {
        let id = format!("{}_{}", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// The next generated name for which `taken` is false.
    pub fn fresh_unless(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.fresh();
            if !taken(&id) {
                return id;
            }
        }
    }
}
