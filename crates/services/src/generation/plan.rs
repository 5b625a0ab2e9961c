use rand::Rng;
use study_core::model::QuestionRange;

/// How many questions a run produces and how they split into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPlan {
    total: u32,
    page_size: u32,
}

impl GenerationPlan {
    /// Draws the total uniformly from the inclusive range.
    #[must_use]
    pub fn draw<R: Rng + ?Sized>(range: QuestionRange, page_size: u32, rng: &mut R) -> Self {
        let total = rng.random_range(range.min()..=range.max());
        Self::new(total, page_size)
    }

    /// A page size of zero is treated as one.
    #[must_use]
    pub fn new(total: u32, page_size: u32) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.total.div_ceil(self.page_size)
    }

    /// Number of questions page `index` (0-based) contributes.
    #[must_use]
    pub fn page_capacity(&self, index: u32) -> u32 {
        let offset = index.saturating_mul(self.page_size);
        self.total.saturating_sub(offset).min(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pages_cover_total_exactly() {
        let plan = GenerationPlan::new(23, 10);
        assert_eq!(plan.page_count(), 3);
        let capacities: Vec<u32> = (0..plan.page_count()).map(|i| plan.page_capacity(i)).collect();
        assert_eq!(capacities, [10, 10, 3]);
        assert_eq!(plan.page_capacity(3), 0);
    }

    #[test]
    fn degenerate_range_draws_its_only_value() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = QuestionRange::new(5, 5).unwrap();
        let plan = GenerationPlan::draw(range, 10, &mut rng);
        assert_eq!(plan.total(), 5);
        assert_eq!(plan.page_count(), 1);
        assert_eq!(plan.page_capacity(0), 5);
    }

    #[test]
    fn draws_stay_within_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let range = QuestionRange::new(12, 18).unwrap();
        for _ in 0..200 {
            let plan = GenerationPlan::draw(range, 10, &mut rng);
            assert!(range.contains(plan.total()));
        }
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let plan = GenerationPlan::new(3, 0);
        assert_eq!(plan.page_size(), 1);
        assert_eq!(plan.page_count(), 3);
    }
}
