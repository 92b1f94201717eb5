//! Page arithmetic and link lists
//!
//! Every link carries the `paged` fragment of its target page, written in the
//! same mode as the current request, so a client can replay the request by
//! substituting that one parameter.

use std::ops::RangeInclusive;

use efq_parser::{PagerMode, PagerSpec};
use efq_shared::Params;
use serde::Serialize;

/// Label of the previous-page link
pub const PREV_LABEL: &str = "Previous";
/// Label of the next-page link
pub const NEXT_LABEL: &str = "Next";
/// Label of an ellipsis link
pub const ELLIPSIS_LABEL: &str = "…";

/// Page counts for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagerState {
    /// Current page, 1-based
    pub current_page: u64,
    /// Records per page
    pub per_page: u64,
    /// Records matching the filters
    pub total_items: u64,
    /// `ceil(total_items / per_page)`
    pub total_pages: u64,
    /// Rendering strategy
    pub mode: PagerMode,
}

impl PagerState {
    /// Compute the state for `spec` over `total_items` records
    pub fn new(spec: PagerSpec, total_items: u64) -> Self {
        let per_page = spec.per_page.max(1);
        Self {
            current_page: spec.page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page),
            mode: spec.mode,
        }
    }

    /// Pager fragment pointing at `page`, in the current mode
    pub fn spec_for(&self, page: u64) -> PagerSpec {
        PagerSpec {
            page,
            per_page: self.per_page,
            mode: self.mode,
        }
    }

    /// Whether a restricted pager shows page `i`
    fn is_visible(&self, i: u64, size: u32) -> bool {
        let (current, total, size) = (self.current_page, self.total_pages, u64::from(size));
        let offset = size.saturating_sub(1) / 2;
        // i <= total - size && i < current - offset, rearranged to stay unsigned
        let before = i.checked_add(size).is_some_and(|end| end <= total)
            && i.checked_add(offset).is_some_and(|end| end < current);
        let after = i > size && i > current.saturating_add(offset);
        !before && !after
    }

    /// Pages a restricted pager can show; everything outside is hidden
    fn window(&self, size: u32) -> RangeInclusive<u64> {
        let (current, total, size) = (self.current_page, self.total_pages, u64::from(size));
        let offset = size.saturating_sub(1) / 2;
        let first = current
            .saturating_sub(offset)
            .min(total.saturating_sub(size).saturating_add(1))
            .max(1);
        let last = current.saturating_add(offset).max(size).min(total);
        first..=last
    }
}

/// What a link does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerLinkKind {
    /// Previous page
    Prev,
    /// Next page
    Next,
    /// A numbered page
    Page,
    /// Jump to the first or last page from a restricted window
    Ellipsis,
    /// "Page X of Y", not clickable
    Text,
}

/// One entry of the pager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerLink {
    /// Kind of link
    pub kind: PagerLinkKind,
    /// Text shown to the user
    pub label: String,
    /// Page the link points at
    pub target_page: u64,
    /// `paged` fragment that replays the request on the target page
    pub target_page_spec: String,
    /// Whether this is the current page
    pub is_active: bool,
    /// Whether this is an ellipsis jump
    pub is_ellipsis: bool,
}

impl PagerLink {
    fn new(state: &PagerState, kind: PagerLinkKind, label: impl Into<String>, page: u64) -> Self {
        Self {
            kind,
            label: label.into(),
            target_page: page,
            target_page_spec: state.spec_for(page).to_string(),
            is_active: kind == PagerLinkKind::Page && page == state.current_page,
            is_ellipsis: kind == PagerLinkKind::Ellipsis,
        }
    }
}

/// Pager state plus the links to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pager {
    /// Page counts
    pub state: PagerState,
    /// Links in display order
    pub links: Vec<PagerLink>,
}

/// Links for `state`; empty when everything fits on one page
pub fn links(state: &PagerState) -> Vec<PagerLink> {
    let total = state.total_pages;
    let current = state.current_page;
    if total <= 1 {
        return Vec::new();
    }

    let mut links = Vec::new();
    if current > 1 {
        links.push(PagerLink::new(state, PagerLinkKind::Prev, PREV_LABEL, current - 1));
    }

    match state.mode {
        PagerMode::Default => {
            links.extend((1..=total).map(|i| PagerLink::new(state, PagerLinkKind::Page, i.to_string(), i)));
        }
        PagerMode::Simple => {
            links.push(PagerLink::new(
                state,
                PagerLinkKind::Text,
                format!("Page {current} of {total}"),
                current,
            ));
        }
        PagerMode::Restricted(size) => {
            let offset = u64::from(size.saturating_sub(1) / 2);
            if current > offset.saturating_add(1) {
                links.push(PagerLink::new(state, PagerLinkKind::Ellipsis, ELLIPSIS_LABEL, 1));
            }
            links.extend(
                state
                    .window(size)
                    .filter(|&i| state.is_visible(i, size))
                    .map(|i| PagerLink::new(state, PagerLinkKind::Page, i.to_string(), i)),
            );
            if current.saturating_add(offset) < total {
                links.push(PagerLink::new(state, PagerLinkKind::Ellipsis, ELLIPSIS_LABEL, total));
            }
        }
    }

    if current < total {
        links.push(PagerLink::new(state, PagerLinkKind::Next, NEXT_LABEL, current + 1));
    }
    links
}

/// Pager for `spec` over `total_items` records, `None` when a single page
/// holds everything
pub fn paginate(spec: PagerSpec, total_items: u64) -> Option<Pager> {
    let state = PagerState::new(spec, total_items);
    if state.total_pages <= 1 {
        return None;
    }
    Some(Pager {
        links: links(&state),
        state,
    })
}

/// Parameters that replay the original request on the link's page
pub fn replay_params(params: &Params, link: &PagerLink) -> Params {
    let mut replay = params.clone();
    replay.insert("paged".to_string(), link.target_page_spec.clone());
    replay
}

#[cfg(test)]
mod tests {
    use super::*;
    use efq_parser::parse_pager;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn spec(page: u64, per_page: u64, mode: PagerMode) -> PagerSpec {
        PagerSpec {
            page,
            per_page,
            mode,
        }
    }

    fn kinds(links: &[PagerLink]) -> Vec<PagerLinkKind> {
        links.iter().map(|l| l.kind).collect()
    }

    fn pages(links: &[PagerLink]) -> Vec<u64> {
        links
            .iter()
            .filter(|l| l.kind == PagerLinkKind::Page)
            .map(|l| l.target_page)
            .collect()
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let state = PagerState::new(spec(1, 10, PagerMode::Default), 95);
        assert_eq!(state.total_pages, 10);
        assert_eq!(PagerState::new(spec(1, 10, PagerMode::Default), 0).total_pages, 0);
        assert_eq!(PagerState::new(spec(1, 10, PagerMode::Default), 10).total_pages, 1);
    }

    #[test]
    fn test_default_first_and_last_page() {
        let first = paginate(spec(1, 10, PagerMode::Default), 95).unwrap();
        assert_eq!(first.links.first().unwrap().kind, PagerLinkKind::Page);
        assert_eq!(first.links.last().unwrap().kind, PagerLinkKind::Next);
        assert_eq!(pages(&first.links), (1..=10).collect::<Vec<_>>());
        assert!(first.links[0].is_active);

        let last = paginate(spec(10, 10, PagerMode::Default), 95).unwrap();
        assert_eq!(last.links.first().unwrap().kind, PagerLinkKind::Prev);
        assert_eq!(last.links.last().unwrap().kind, PagerLinkKind::Page);
        assert_eq!(last.links[0].target_page_spec, "9-10");
    }

    #[test]
    fn test_single_page_has_no_pager() {
        assert_eq!(paginate(spec(1, 10, PagerMode::Default), 10), None);
        assert_eq!(paginate(spec(1, 10, PagerMode::Restricted(5)), 3), None);
        assert_eq!(paginate(spec(1, 10, PagerMode::Simple), 0), None);
    }

    #[test]
    fn test_simple_mode() {
        let pager = paginate(spec(2, 10, PagerMode::Simple), 35).unwrap();
        assert_eq!(
            kinds(&pager.links),
            vec![PagerLinkKind::Prev, PagerLinkKind::Text, PagerLinkKind::Next]
        );
        assert_eq!(pager.links[1].label, "Page 2 of 4");
        assert_eq!(pager.links[0].target_page_spec, "1-10--simple");
        assert_eq!(pager.links[2].target_page_spec, "3-10--simple");
    }

    #[test]
    fn test_restricted_window_in_the_middle() {
        let pager = paginate(spec(5, 10, PagerMode::Restricted(5)), 95).unwrap();
        assert_eq!(pages(&pager.links), vec![3, 4, 5, 6, 7]);
        assert_eq!(
            kinds(&pager.links),
            vec![
                PagerLinkKind::Prev,
                PagerLinkKind::Ellipsis,
                PagerLinkKind::Page,
                PagerLinkKind::Page,
                PagerLinkKind::Page,
                PagerLinkKind::Page,
                PagerLinkKind::Page,
                PagerLinkKind::Ellipsis,
                PagerLinkKind::Next,
            ]
        );
        assert_eq!(pager.links[1].target_page, 1);
        assert_eq!(pager.links[7].target_page, 10);
        assert!(pager.links[1].is_ellipsis);
        assert_eq!(pager.links[7].target_page_spec, "10-10--restricted-5");
    }

    #[test]
    fn test_restricted_window_at_the_edges() {
        let start = paginate(spec(1, 10, PagerMode::Restricted(5)), 95).unwrap();
        assert_eq!(pages(&start.links), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            start.links.iter().filter(|l| l.is_ellipsis).count(),
            1,
            "only the trailing ellipsis"
        );

        let end = paginate(spec(10, 10, PagerMode::Restricted(5)), 95).unwrap();
        assert_eq!(pages(&end.links), vec![6, 7, 8, 9, 10]);
        assert_eq!(end.links[1].kind, PagerLinkKind::Ellipsis);
        assert_eq!(end.links.last().unwrap().kind, PagerLinkKind::Page);
    }

    #[test]
    fn test_page_numbers_at_the_top_of_the_range() {
        let last = paginate(spec(u64::MAX, 1, PagerMode::Restricted(5)), u64::MAX).unwrap();
        assert_eq!(last.state.total_pages, u64::MAX);
        assert_eq!(pages(&last.links), ((u64::MAX - 4)..=u64::MAX).collect::<Vec<_>>());
        assert_eq!(last.links.len(), 7);
        assert_eq!(last.links[0].kind, PagerLinkKind::Prev);
        assert_eq!(last.links[0].target_page, u64::MAX - 1);
        assert_eq!(last.links[1].kind, PagerLinkKind::Ellipsis);
        assert!(last.links.last().unwrap().is_active);

        let first = paginate(spec(1, 1, PagerMode::Restricted(5)), u64::MAX).unwrap();
        assert_eq!(pages(&first.links), vec![1, 2, 3, 4, 5]);
        assert_eq!(first.links[5].target_page, u64::MAX);

        let beyond = paginate(spec(u64::MAX, 10, PagerMode::Default), 100).unwrap();
        assert_eq!(pages(&beyond.links), (1..=10).collect::<Vec<_>>());
        assert_eq!(beyond.links.last().unwrap().kind, PagerLinkKind::Page);

        let simple = paginate(spec(u64::MAX, 10, PagerMode::Simple), 100).unwrap();
        assert_eq!(simple.links[1].label, format!("Page {} of 10", u64::MAX));
    }

    #[test]
    fn test_replay_params_replace_paged_in_place() {
        let params = efq_shared::params([
            ("content_type", "article"),
            ("paged", "1-10"),
            ("sort", "created-DESC"),
        ]);
        let pager = paginate(spec(1, 10, PagerMode::Default), 30).unwrap();
        let next = pager.links.last().unwrap();
        let replay = replay_params(&params, next);
        assert_eq!(replay.get_index(1), Some((&"paged".to_string(), &"2-10".to_string())));
        assert_eq!(replay.len(), 3);
    }

    fn any_mode() -> impl Strategy<Value = PagerMode> {
        prop_oneof![
            Just(PagerMode::Default),
            Just(PagerMode::Simple),
            (0u32..6).prop_map(|n| PagerMode::Restricted(n * 2 + 1)),
        ]
    }

    proptest! {
        #[test]
        fn prop_links_round_trip_through_the_parser(
            total in 0u64..500,
            per_page in 1u64..25,
            page_seed in 0u64..1000,
            mode in any_mode(),
        ) {
            let total_pages = total.div_ceil(per_page).max(1);
            let page = page_seed % total_pages + 1;
            if let Some(pager) = paginate(spec(page, per_page, mode), total) {
                for link in &pager.links {
                    let parsed = parse_pager(&link.target_page_spec).unwrap();
                    prop_assert_eq!(parsed, spec(link.target_page, per_page, mode));
                }
            }
        }

        #[test]
        fn prop_prev_and_next_only_when_possible(
            total in 1u64..500,
            per_page in 1u64..25,
            page_seed in 0u64..1000,
            mode in any_mode(),
        ) {
            let state = PagerState::new(spec(1, per_page, mode), total);
            let page = page_seed % state.total_pages + 1;
            let links = links(&PagerState::new(spec(page, per_page, mode), total));
            let has_prev = links.iter().any(|l| l.kind == PagerLinkKind::Prev);
            let has_next = links.iter().any(|l| l.kind == PagerLinkKind::Next);
            prop_assert_eq!(has_prev, state.total_pages > 1 && page > 1);
            prop_assert_eq!(has_next, page < state.total_pages);
        }

        #[test]
        fn prop_restricted_window_has_fixed_width(
            total in 1u64..500,
            page_seed in 0u64..1000,
            n in 0u32..6,
        ) {
            let size = n * 2 + 1;
            let state = PagerState::new(spec(1, 1, PagerMode::Restricted(size)), total);
            let page = page_seed % state.total_pages + 1;
            let links = links(&PagerState::new(spec(page, 1, PagerMode::Restricted(size)), total));
            let shown = pages(&links);
            if state.total_pages > 1 {
                prop_assert_eq!(shown.len() as u64, state.total_pages.min(u64::from(size)));
                prop_assert!(shown.contains(&page));
            }
        }
    }
}
