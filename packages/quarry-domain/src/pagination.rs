/// The `offset`/`limit` pair sent to the index for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	pub offset: u64,
	pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Deep pagination is not allowed.")]
pub struct DeepPaginationError {
	pub offset: u64,
	pub max_depth: u64,
}

/// Guards the index against deep ranked scans and bounds the page count reported to clients.
///
/// The cap is expressed as a result offset, so it holds for any page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthCap {
	max_depth: u64,
}
impl DepthCap {
	pub const fn new(max_depth: u64) -> Self {
		Self { max_depth }
	}

	pub fn max_depth(&self) -> u64 {
		self.max_depth
	}

	/// Fails before any index call when the page starts past `max_depth`.
	pub fn window(&self, page: u64, page_size: u64) -> Result<PageWindow, DeepPaginationError> {
		let offset = page.saturating_sub(1).saturating_mul(page_size);

		if offset > self.max_depth {
			return Err(DeepPaginationError { offset, max_depth: self.max_depth });
		}

		Ok(PageWindow { offset, limit: page_size })
	}

	/// Rounds to the nearest page rather than truncating.
	pub fn last_allowed_page(&self, page_size: u64) -> u64 {
		if page_size == 0 {
			return 0;
		}

		(self.max_depth + page_size / 2) / page_size
	}

	/// The natural count floors while the cap rounds; the asymmetry is intentional.
	pub fn page_count(&self, total_hits: u64, page_size: u64) -> u64 {
		if page_size == 0 {
			return 0;
		}

		let natural_page_count = total_hits / page_size;

		natural_page_count.min(self.last_allowed_page(page_size))
	}
}
impl Default for DepthCap {
	fn default() -> Self {
		Self::new(5_000)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn computes_zero_based_offset() {
		let cap = DepthCap::default();

		assert_eq!(cap.window(1, 20), Ok(PageWindow { offset: 0, limit: 20 }));
		assert_eq!(cap.window(3, 20), Ok(PageWindow { offset: 40, limit: 20 }));
	}

	#[test]
	fn offset_equal_to_depth_is_still_served() {
		let cap = DepthCap::default();

		assert_eq!(cap.window(251, 20), Ok(PageWindow { offset: 5_000, limit: 20 }));
		assert_eq!(
			cap.window(252, 20),
			Err(DeepPaginationError { offset: 5_020, max_depth: 5_000 })
		);
	}

	#[test]
	fn rejects_every_page_past_the_cap() {
		let cap = DepthCap::default();

		for page_size in 1..=500_u64 {
			let first_rejected = 5_000 / page_size + 2;

			assert!(cap.window(first_rejected - 1, page_size).is_ok(), "page_size={page_size}");
			assert!(cap.window(first_rejected, page_size).is_err(), "page_size={page_size}");
		}
	}

	#[test]
	fn huge_pages_saturate_instead_of_overflowing() {
		let cap = DepthCap::default();

		assert!(cap.window(u64::MAX, 500).is_err());
	}

	#[test]
	fn page_count_never_exceeds_cap() {
		let cap = DepthCap::default();

		for page_size in 1..=500_u64 {
			let bound = (5_000 + page_size / 2) / page_size;

			assert!(cap.page_count(u64::MAX, page_size) <= bound, "page_size={page_size}");
			assert_eq!(cap.page_count(u64::MAX, page_size), bound);
		}
	}

	#[test]
	fn picks_cap_over_natural_count() {
		let cap = DepthCap::default();

		assert_eq!(cap.page_count(10_000, 20), 250);
		assert_eq!(cap.last_allowed_page(500), 10);
		assert_eq!(cap.last_allowed_page(1), 5_000);
	}

	#[test]
	fn cap_rounds_to_nearest_page() {
		let cap = DepthCap::default();

		// 5000 / 3 = 1666.67, so the cap lands on 1667.
		assert_eq!(cap.last_allowed_page(3), 1_667);
		// 5000 / 300 = 16.67 rounds up to 17.
		assert_eq!(cap.last_allowed_page(300), 17);
		// 5000 / 400 = 12.5 rounds up to 13.
		assert_eq!(cap.last_allowed_page(400), 13);
	}

	#[test]
	fn natural_count_floors() {
		let cap = DepthCap::default();

		assert_eq!(cap.page_count(0, 20), 0);
		assert_eq!(cap.page_count(19, 20), 0);
		assert_eq!(cap.page_count(59, 20), 2);
	}
}
