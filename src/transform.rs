//! Normalizes Jikan records into the shape the Mini App renders.
use serde::{Deserialize, Serialize};

use crate::jikan::AnimeRecord;

pub const DEFAULT_DESCRIPTION: &str = "Tavsif mavjud emas";
pub const DEFAULT_IMAGE: &str = "/placeholder.svg";
pub const DEFAULT_DURATION: &str = "24 min";
pub const DEFAULT_AGE_RATING: &str = "PG-13";
const AIRING_STATUS: &str = "Currently Airing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ongoing,
    Completed,
}

impl ItemStatus {
    pub fn from_upstream(status: Option<&str>) -> Self {
        if status == Some(AIRING_STATUS) {
            ItemStatus::Ongoing
        } else {
            ItemStatus::Completed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub rating: f64,
    pub episodes: u32,
    pub status: ItemStatus,
    pub genre: Vec<String>,
    pub image: String,
    pub year: i32,
    pub duration: String,
    pub age_rating: String,
}

/// Maps one upstream record. Absent, null, zero and empty values all fall
/// back to the defaults; `current_year` fills a missing release year.
pub fn transform(record: &AnimeRecord, current_year: i32) -> CatalogItem {
    let image = record
        .images
        .as_ref()
        .and_then(|i| i.jpg.as_ref())
        .and_then(|j| non_empty(j.large_image_url.as_deref()));

    CatalogItem {
        id: record.mal_id,
        title: record.title.clone().unwrap_or_default(),
        description: non_empty(record.synopsis.as_deref())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        rating: record.score.filter(|s| s.is_finite()).unwrap_or(0.0),
        episodes: record.episodes.unwrap_or(0),
        status: ItemStatus::from_upstream(record.status.as_deref()),
        genre: record
            .genres
            .as_ref()
            .map(|g| g.iter().filter_map(|x| x.name.clone()).collect())
            .unwrap_or_default(),
        image: image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        year: record.year.filter(|y| *y != 0).unwrap_or(current_year),
        duration: non_empty(record.duration.as_deref())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        age_rating: non_empty(record.rating.as_deref())
            .unwrap_or_else(|| DEFAULT_AGE_RATING.to_string()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> AnimeRecord {
        serde_json::from_value(value).expect("record deserialize")
    }

    #[test]
    fn bare_record_gets_every_default() {
        let item = transform(&record(json!({ "mal_id": 7 })), 2025);
        assert_eq!(item.id, 7);
        assert_eq!(item.title, "");
        assert_eq!(item.description, DEFAULT_DESCRIPTION);
        assert_eq!(item.rating, 0.0);
        assert_eq!(item.episodes, 0);
        assert_eq!(item.status, ItemStatus::Completed);
        assert!(item.genre.is_empty());
        assert_eq!(item.image, DEFAULT_IMAGE);
        assert_eq!(item.year, 2025);
        assert_eq!(item.duration, DEFAULT_DURATION);
        assert_eq!(item.age_rating, DEFAULT_AGE_RATING);
    }

    #[test]
    fn explicit_nulls_and_empty_strings_fall_back() {
        let item = transform(
            &record(json!({
                "mal_id": 1,
                "title": "Null Heavy",
                "synopsis": "",
                "score": null,
                "episodes": null,
                "status": null,
                "genres": null,
                "images": { "jpg": { "large_image_url": null } },
                "year": null,
                "duration": "",
                "rating": null
            })),
            2030,
        );
        assert_eq!(item.title, "Null Heavy");
        assert_eq!(item.description, DEFAULT_DESCRIPTION);
        assert_eq!(item.rating, 0.0);
        assert_eq!(item.image, DEFAULT_IMAGE);
        assert_eq!(item.year, 2030);
        assert_eq!(item.duration, DEFAULT_DURATION);
        assert_eq!(item.age_rating, DEFAULT_AGE_RATING);
    }

    #[test]
    fn null_nested_fields_are_skipped() {
        let item = transform(
            &record(json!({
                "mal_id": null,
                "episodes": -1,
                "genres": [{ "name": null }, { "name": "Action" }],
                "images": { "jpg": null }
            })),
            2025,
        );
        assert_eq!(item.id, 0);
        assert_eq!(item.episodes, 0);
        assert_eq!(item.genre, vec!["Action".to_string()]);
        assert_eq!(item.image, DEFAULT_IMAGE);
    }

    #[test]
    fn full_record_maps_through() {
        let item = transform(
            &record(json!({
                "mal_id": 5114,
                "title": "Fullmetal Alchemist: Brotherhood",
                "synopsis": "Two brothers.",
                "score": 9.1,
                "episodes": 64,
                "status": "Finished Airing",
                "genres": [{ "name": "Action" }, { "name": "Drama" }],
                "images": { "jpg": { "large_image_url": "https://cdn.myanimelist.net/fmab.jpg" } },
                "year": 2009,
                "duration": "24 min per ep",
                "rating": "R - 17+ (violence & profanity)",
                "unexpected": { "nested": true }
            })),
            2025,
        );
        assert_eq!(item.id, 5114);
        assert_eq!(item.rating, 9.1);
        assert_eq!(item.episodes, 64);
        assert_eq!(item.genre, vec!["Action".to_string(), "Drama".to_string()]);
        assert_eq!(item.image, "https://cdn.myanimelist.net/fmab.jpg");
        assert_eq!(item.year, 2009);
        assert_eq!(item.duration, "24 min per ep");
        assert_eq!(item.age_rating, "R - 17+ (violence & profanity)");
    }

    #[test]
    fn only_currently_airing_is_ongoing() {
        assert_eq!(
            ItemStatus::from_upstream(Some("Currently Airing")),
            ItemStatus::Ongoing
        );
        for other in [
            "Finished Airing",
            "Not yet aired",
            "currently airing",
            "Currently Airing ",
            "",
        ] {
            assert_eq!(
                ItemStatus::from_upstream(Some(other)),
                ItemStatus::Completed,
                "{:?}",
                other
            );
        }
        assert_eq!(ItemStatus::from_upstream(None), ItemStatus::Completed);
    }

    #[test]
    fn serializes_with_client_field_names() {
        let item = transform(
            &record(json!({ "mal_id": 20, "title": "Naruto", "status": "Currently Airing" })),
            2025,
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["ageRating"], "PG-13");
        assert_eq!(value["status"], "ongoing");
        assert!(value.get("age_rating").is_none());
    }
}
