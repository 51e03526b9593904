use quarry_domain::{DepthCap, PageBounds, PageWindow, parse_search_request};

fn query(raw: &str) -> Vec<(String, String)> {
	raw.split('&')
		.filter(|pair| !pair.is_empty())
		.map(|pair| match pair.split_once('=') {
			Some((name, value)) => (name.to_string(), value.to_string()),
			None => (pair.to_string(), String::new()),
		})
		.collect()
}

fn borrowed(params: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
	params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
}

#[test]
fn first_page_of_large_result_set_reports_capped_page_count() {
	let params = query("q=mountain&page=1&pagesize=20");
	let req = parse_search_request(borrowed(&params), PageBounds::default())
		.expect("Expected a valid request.");
	let cap = DepthCap::default();
	let window = cap.window(req.page, req.page_size).expect("First page must be served.");

	assert_eq!(window, PageWindow { offset: 0, limit: 20 });
	// 10000 / 20 = 500 natural pages, capped at (5000 + 10) / 20 = 250.
	assert_eq!(cap.page_count(10_000, req.page_size), 250);
}

#[test]
fn zero_page_size_is_repaired_not_rejected() {
	let params = query("q=mountain&pagesize=0");
	let req = parse_search_request(borrowed(&params), PageBounds::default())
		.expect("Expected a valid request.");

	assert_eq!(req.page_size, 20);
}

#[test]
fn deep_page_is_rejected_after_validation_succeeds() {
	let params = query("q=mountain&page=300&pagesize=20");
	let req = parse_search_request(borrowed(&params), PageBounds::default())
		.expect("Expected a valid request.");
	let err = DepthCap::default()
		.window(req.page, req.page_size)
		.expect_err("Expected deep pagination error.");

	assert_eq!(err.offset, 5_980);
	assert_eq!(err.to_string(), "Deep pagination is not allowed.");
}

#[test]
fn custom_bounds_change_the_repair_target() {
	let params = query("creator=ansel&pagesize=200");
	let bounds = PageBounds { default_page_size: 10, max_page_size: 100 };
	let req = parse_search_request(borrowed(&params), bounds).expect("Expected a valid request.");

	assert_eq!(req.page_size, 10);
}
