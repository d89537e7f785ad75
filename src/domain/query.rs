use crate::domain::model::{Category, Exhibition, ExhibitionId};
use std::collections::BTreeSet;

/// A single conjunctive condition, in the order it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    GalleryPresent,
    IsFree,
    IsRecommended,
    /// Case-insensitive substring of the joined gallery's address.
    AddressContains(String),
    IdIn(Vec<ExhibitionId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhibitionQuery {
    category: Category,
    region: Option<String>,
    bookmarked: Option<BTreeSet<ExhibitionId>>,
}

impl ExhibitionQuery {
    pub fn new(category: Category, region: &str) -> Self {
        let region = region.trim();
        Self {
            category,
            region: (!region.is_empty()).then(|| region.to_string()),
            bookmarked: None,
        }
    }

    /// Restricts to the given ids. `None` when the set is empty: such a query
    /// can only return nothing, so it is never issued.
    pub fn restricted_to(mut self, ids: &BTreeSet<ExhibitionId>) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }
        self.bookmarked = Some(ids.clone());
        Some(self)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::GalleryPresent];

        match self.category {
            Category::Free => predicates.push(Predicate::IsFree),
            Category::Recommended => predicates.push(Predicate::IsRecommended),
            Category::All => {}
        }

        if let Some(region) = &self.region {
            predicates.push(Predicate::AddressContains(region.clone()));
        }

        if let Some(ids) = &self.bookmarked {
            predicates.push(Predicate::IdIn(ids.iter().copied().collect()));
        }

        predicates
    }

    /// Evaluates the predicates against a row held locally.
    pub fn matches(&self, exhibition: &Exhibition) -> bool {
        self.predicates().iter().all(|predicate| match predicate {
            Predicate::GalleryPresent => exhibition.gallery.is_some(),
            Predicate::IsFree => exhibition.is_free,
            Predicate::IsRecommended => exhibition.is_recommended,
            Predicate::AddressContains(needle) => exhibition
                .gallery_address()
                .map(|address| address.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Predicate::IdIn(ids) => ids.contains(&exhibition.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Gallery;

    fn exhibition(id: i64, address: Option<&str>, is_free: bool) -> Exhibition {
        Exhibition {
            id: ExhibitionId(id),
            title: format!("Exhibition {}", id),
            date_range: None,
            location: None,
            is_free,
            is_recommended: false,
            gallery: address.map(|a| Gallery {
                id: None,
                name: None,
                address: Some(a.to_string()),
            }),
        }
    }

    #[test]
    fn test_all_category_only_requires_gallery() {
        let query = ExhibitionQuery::new(Category::All, "");
        assert_eq!(query.predicates(), vec![Predicate::GalleryPresent]);
        assert!(query.region().is_none());
    }

    #[test]
    fn test_predicates_in_priority_order() {
        let ids: BTreeSet<_> = [ExhibitionId(3), ExhibitionId(1)].into_iter().collect();
        let query = ExhibitionQuery::new(Category::Free, " 서울 ")
            .restricted_to(&ids)
            .unwrap();

        assert_eq!(
            query.predicates(),
            vec![
                Predicate::GalleryPresent,
                Predicate::IsFree,
                Predicate::AddressContains("서울".to_string()),
                Predicate::IdIn(vec![ExhibitionId(1), ExhibitionId(3)]),
            ]
        );
    }

    #[test]
    fn test_empty_id_set_short_circuits() {
        let query = ExhibitionQuery::new(Category::Recommended, "");
        assert!(query.restricted_to(&BTreeSet::new()).is_none());
    }

    #[test]
    fn test_region_match_is_case_insensitive_substring() {
        let query = ExhibitionQuery::new(Category::All, "seoul");
        assert!(query.matches(&exhibition(1, Some("12 Samcheong-ro, SEOUL"), false)));
        assert!(!query.matches(&exhibition(2, Some("Busan Haeundae"), false)));
        assert!(!query.matches(&exhibition(3, None, false)));

        let korean = ExhibitionQuery::new(Category::All, "서울");
        assert!(korean.matches(&exhibition(4, Some("서울특별시 종로구"), false)));
        assert!(!korean.matches(&exhibition(5, Some("인천광역시 중구"), false)));
    }

    #[test]
    fn test_rows_without_gallery_never_match() {
        let query = ExhibitionQuery::new(Category::Free, "");
        assert!(!query.matches(&exhibition(1, None, true)));
        assert!(query.matches(&exhibition(2, Some("anywhere"), true)));
        assert!(!query.matches(&exhibition(3, Some("anywhere"), false)));
    }
}
