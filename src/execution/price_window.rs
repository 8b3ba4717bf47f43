use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer of recent prices.
///
/// This is the single source of truth for both the volatility and the
/// moving-average computations; neither keeps its own copy that could
/// drift out of sync. The engine owns it and is the only writer.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a price, evicting the oldest sample on overflow.
    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        while self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.prices.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    /// Most recent tick-over-tick change; 0 until two samples exist.
    pub fn latest_change(&self) -> f64 {
        let n = self.prices.len();
        if n < 2 {
            return 0.0;
        }
        self.prices[n - 1] - self.prices[n - 2]
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}
