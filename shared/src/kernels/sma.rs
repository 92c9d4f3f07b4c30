use super::super::kernel::{GraphContext, Kernel, NodeId};
use super::super::node_def::NodeDefinition;
use super::super::operation_registry::OperationRegistry;

/// Reference stateful kernel: a simple moving average over a single input
/// parent, computed in `O(1)` per call via a circular buffer and a
/// running sum.
///
/// During warmup (fewer than `lookback` samples seen), the returned value
/// is the mean of the samples seen so far rather than an error or a
/// partially-filled-with-zero average.
pub struct SimpleMovingAverage {
    lookback: usize,
    buffer: Vec<f64>,
    write_cursor: usize,
    count: usize,
    running_sum: f64,
    evaluations: u64,
}

impl SimpleMovingAverage {
    pub fn new(lookback: usize) -> SimpleMovingAverage {
        assert!(lookback > 0, "SMA lookback must be positive");
        SimpleMovingAverage {
            lookback,
            buffer: vec![0.0; lookback],
            write_cursor: 0,
            count: 0,
            running_sum: 0.0,
            evaluations: 0,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

impl Kernel for SimpleMovingAverage {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let parent_id = graph.parent_ids(node_id)[0];
        let x = graph.value(parent_id);

        if self.count == self.lookback {
            self.running_sum -= self.buffer[self.write_cursor];
        }
        self.buffer[self.write_cursor] = x;
        self.running_sum += x;
        self.write_cursor = (self.write_cursor + 1) % self.lookback;
        if self.count < self.lookback {
            self.count += 1;
        }
        self.evaluations += 1;

        self.running_sum / self.count as f64
    }

    fn reset(&mut self) {
        for slot in self.buffer.iter_mut() {
            *slot = 0.0;
        }
        self.write_cursor = 0;
        self.count = 0;
        self.running_sum = 0.0;
    }

    fn is_ready(&self) -> bool {
        self.count >= self.lookback
    }

    fn evaluation_count(&self) -> u64 {
        self.evaluations
    }
}

/// Reads the per-node `lookback` parameter off the `NodeDefinition` being
/// compiled. The compiler validates `lookback > 0` before ever binding a
/// kernel (`NonPositiveLookback` is a compile-time error, not a panic
/// here), so by the time this factory runs the value is known-good; a
/// missing key falls back to `1` only so a directly-constructed
/// `NodeDefinition` without the compiler's validation still behaves
/// sensibly rather than panicking deep inside a factory call.
fn factory(def: &NodeDefinition) -> Box<dyn Kernel> {
    let lookback = def.parameters.get("lookback").copied().unwrap_or(1).max(1) as usize;
    Box::new(SimpleMovingAverage::new(lookback))
}

pub(crate) fn register(registry: &OperationRegistry) {
    registry
        .register_fixed("SMA", 1, factory, true, "Simple moving average over one input")
        .unwrap();
}
