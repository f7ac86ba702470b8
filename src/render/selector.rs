use rand::Rng;

/// Picks an index in `0..len`. Injected so rendering can be made deterministic.
pub trait Selector: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Production selector: uniform over all items
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always picks the same position, wrapping around short lists
#[cfg(test)]
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSelector(pub usize);

#[cfg(test)]
impl Selector for FixedSelector {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.0 % len
    }
}

pub fn choose<'a, T>(selector: &dyn Selector, items: &'a [T]) -> Option<&'a T> {
    items.get(selector.pick(items.len()))
}
