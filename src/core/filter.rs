use crate::domain::model::Category;
use crate::domain::query::ExhibitionQuery;
use crate::utils::error::Result;
use url::Url;

/// Query parameter carrying the bookmark-only flag in shareable links.
pub const BOOKMARK_PARAM: &str = "isBookmark";

/// Region choices offered to users. The filter itself accepts any text.
pub const REGIONS: [&str; 8] = [
    "서울", "인천", "경기", "충청", "경상", "전라", "강원", "제주",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    category: Category,
    region: String,
    bookmark_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Category(Category),
    Region(String),
    BookmarkOnly(bool),
    Reset,
}

impl FilterState {
    pub fn new(category: Category, region: impl Into<String>, bookmark_only: bool) -> Self {
        Self {
            category,
            region: region.into(),
            bookmark_only,
        }
    }

    /// Seeds the initial state from an incoming link (`isBookmark=true|1`).
    pub fn from_link(link: &str) -> Result<Self> {
        let url = Url::parse(link)?;
        let bookmark_only = url
            .query_pairs()
            .any(|(key, value)| key == BOOKMARK_PARAM && (value == "true" || value == "1"));
        Ok(Self {
            bookmark_only,
            ..Self::default()
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn bookmark_only(&self) -> bool {
        self.bookmark_only
    }

    pub fn set_category(&mut self, category: Category) -> bool {
        let changed = self.category != category;
        self.category = category;
        changed
    }

    pub fn set_region(&mut self, region: impl Into<String>) -> bool {
        let region = region.into();
        let changed = self.region != region;
        self.region = region;
        changed
    }

    pub fn set_bookmark_only(&mut self, bookmark_only: bool) -> bool {
        let changed = self.bookmark_only != bookmark_only;
        self.bookmark_only = bookmark_only;
        changed
    }

    pub fn reset(&mut self) -> bool {
        let changed = *self != Self::default();
        *self = Self::default();
        changed
    }

    /// Applies a change; `false` when nothing actually changed.
    pub fn apply(&mut self, change: FilterChange) -> bool {
        match change {
            FilterChange::Category(category) => self.set_category(category),
            FilterChange::Region(region) => self.set_region(region),
            FilterChange::BookmarkOnly(on) => self.set_bookmark_only(on),
            FilterChange::Reset => self.reset(),
        }
    }

    /// Category and region part of the query; bookmark ids are added by the caller.
    pub fn base_query(&self) -> ExhibitionQuery {
        ExhibitionQuery::new(self.category, &self.region)
    }
}

/// Returns `link` with the bookmark flag set to `true` or removed.
pub fn bookmark_link(link: &str, bookmark_only: bool) -> Result<Url> {
    let mut url = Url::parse(link)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != BOOKMARK_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    if !kept.is_empty() || bookmark_only {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if bookmark_only {
            pairs.append_pair(BOOKMARK_PARAM, "true");
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_report_changes() {
        let mut filter = FilterState::default();
        assert!(!filter.set_category(Category::All));
        assert!(filter.set_category(Category::Free));
        assert!(filter.set_region("서울"));
        assert!(!filter.set_region("서울"));
        assert!(filter.set_bookmark_only(true));

        assert!(filter.apply(FilterChange::Reset));
        assert_eq!(filter, FilterState::default());
        assert!(!filter.apply(FilterChange::Reset));
    }

    #[test]
    fn test_from_link_seeds_bookmark_flag() {
        for link in [
            "https://example.com/exhibitionList?isBookmark=true",
            "https://example.com/exhibitionList?tab=free&isBookmark=1",
        ] {
            assert!(FilterState::from_link(link).unwrap().bookmark_only(), "{}", link);
        }

        for link in [
            "https://example.com/exhibitionList",
            "https://example.com/exhibitionList?isBookmark=yes",
            "https://example.com/exhibitionList?isBookmark=false",
        ] {
            assert!(!FilterState::from_link(link).unwrap().bookmark_only(), "{}", link);
        }

        assert!(FilterState::from_link("not a url").is_err());
    }

    #[test]
    fn test_bookmark_link_sets_and_removes_param() {
        let on = bookmark_link("https://example.com/exhibitionList?tab=free", true).unwrap();
        assert_eq!(
            on.as_str(),
            "https://example.com/exhibitionList?tab=free&isBookmark=true"
        );

        let off = bookmark_link(on.as_str(), false).unwrap();
        assert_eq!(off.as_str(), "https://example.com/exhibitionList?tab=free");

        let bare = bookmark_link("https://example.com/exhibitionList?isBookmark=1", false).unwrap();
        assert_eq!(bare.as_str(), "https://example.com/exhibitionList");
    }

    #[test]
    fn test_base_query_uses_category_and_region() {
        let filter = FilterState::new(Category::Recommended, "경기", true);
        let query = filter.base_query();
        assert_eq!(query.category(), Category::Recommended);
        assert_eq!(query.region(), Some("경기"));
    }
}
