use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-wide string interner shared by reference. Used for both
/// chromosome and sample identifiers, which persist for the entire
/// process even though markers and PBWT state are dropped per chromosome.
#[derive(Debug, Default)]
pub struct Interner {
    inner: Mutex<InternerInner>,
}

#[derive(Debug, Default)]
struct InternerInner {
    strings: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Interner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Interns `s`, returning its stable id. Existing ids are reused.
    pub fn intern(&self, s: &str) -> u32 {
        let mut inner = self.inner.lock().expect("interner mutex poisoned");
        if let Some(&id) = inner.ids.get(s) {
            return id;
        }
        let id = inner.strings.len() as u32;
        inner.strings.push(s.to_string());
        inner.ids.insert(s.to_string(), id);
        id
    }

    pub fn resolve(&self, id: u32) -> String {
        let inner = self.inner.lock().expect("interner mutex poisoned");
        inner.strings[id as usize].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_ids_for_repeated_strings() {
        let interner = Interner::new();
        let a = interner.intern("chr1");
        let b = interner.intern("chr2");
        let a2 = interner.intern("chr1");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "chr1");
        assert_eq!(interner.resolve(b), "chr2");
    }
}
