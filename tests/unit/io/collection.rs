//! Tests for merging update batches into a caller-side collection

#[cfg(test)]
mod tests {
    use greedylayers::algorithm::ledger::canonical_key;
    use greedylayers::catalog::favorites::{FavoriteBag, resolve_favorite};
    use greedylayers::catalog::model::Catalog;
    use greedylayers::catalog::request::RunRequest;
    use greedylayers::io::collection::Collection;
    use greedylayers::io::message::WireImage;
    use std::sync::Arc;

    fn catalog() -> Arc<Catalog> {
        let request = RunRequest::from_json_str(
            r#"{ "layers": [
                { "id": "A", "required": true, "pieces": [{ "id": "a1" }, { "id": "a2" }] },
                { "id": "B", "pieces": [{ "id": "b1" }, { "id": "b2" }] }
            ], "size": 1 }"#,
        )
        .expect("Failed to parse request");
        Arc::new(Catalog::from_request(&request).expect("Failed to build catalog"))
    }

    fn wire(number: usize, key: u64, attributes: &[&str]) -> WireImage {
        WireImage {
            number,
            key,
            favorite: None,
            attributes: attributes.iter().map(ToString::to_string).collect(),
        }
    }

    // Tests batches from another job never reach the collection
    // Verified by removing the job comparison
    #[test]
    fn test_stale_batch_discarded() {
        let mut collection = Collection::new(catalog(), 2, 3);
        assert_eq!(collection.merge(1, vec![wire(1, 10, &["a1"])]), 0);
        assert_eq!(collection.received(), 0);
        assert_eq!(collection.job(), 2);
    }

    // Tests merged images resolve their pieces and get distinct local ids
    // Verified by reusing one local id for every image
    #[test]
    fn test_merge_resolves_pieces() {
        let mut collection = Collection::new(catalog(), 1, 3);
        let merged = collection.merge(1, vec![wire(2, 10, &["a1", "b2"]), wire(1, 11, &["a2"])]);
        assert_eq!(merged, 2);

        let images = collection.images();
        let first = images.first().expect("Missing image");
        let second = images.get(1).expect("Missing image");
        assert_ne!(first.id, second.id);
        assert_eq!(first.image.number(), 2);
        assert_eq!(first.image.attribute_ids(collection.catalog()), vec!["a1", "b2"]);
        assert_eq!(collection.image(second.id).map(|entry| entry.image.key()), Some(11));
    }

    // Tests duplicate keys and unknown pieces are dropped
    // Verified by pushing every received image unconditionally
    #[test]
    fn test_duplicates_and_unknown_pieces() {
        let mut collection = Collection::new(catalog(), 1, 3);
        collection.merge(1, vec![wire(1, 10, &["a1"])]);
        let merged = collection.merge(1, vec![wire(2, 10, &["a2"]), wire(3, 12, &["a2", "zz"])]);

        assert_eq!(merged, 1);
        let last = collection.images().last().expect("Missing image");
        assert_eq!(last.image.attribute_ids(collection.catalog()), vec!["a2"]);
    }

    // Tests progress and completion track the requested size
    // Verified by dividing by the received count
    #[test]
    fn test_progress() {
        let mut collection = Collection::new(catalog(), 1, 4);
        assert!((collection.progress() - 0.0).abs() < f64::EPSILON);
        collection.merge(1, vec![wire(1, 1, &["a1"]), wire(2, 2, &["a2"])]);
        assert!((collection.progress() - 0.5).abs() < f64::EPSILON);
        assert!(!collection.is_complete());
        collection.merge(1, vec![wire(3, 3, &["a1", "b1"]), wire(4, 4, &["a2", "b1"])]);
        assert!(collection.is_complete());
        assert_eq!(collection.size(), 4);

        let empty = Collection::new(catalog(), 1, 0);
        assert!((empty.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expected_len_capped_by_combinations() {
        let collection = Collection::new(catalog(), 1, 50);
        assert_eq!(collection.expected_len(), 6);
    }

    // Tests usage counts per layer and per piece
    // Verified by counting only layers
    #[test]
    fn test_counts() {
        let mut collection = Collection::new(catalog(), 1, 3);
        collection.merge(
            1,
            vec![wire(1, 1, &["a1", "b1"]), wire(2, 2, &["a1"]), wire(3, 3, &["a2", "b1"])],
        );
        let counts = collection.counts();
        assert_eq!(counts.get("A"), Some(&3));
        assert_eq!(counts.get("B"), Some(&2));
        assert_eq!(counts.get("a1"), Some(&2));
        assert_eq!(counts.get("b2"), None);
    }

    fn keyed(catalog: &Catalog, number: usize, attributes: &[&str]) -> WireImage {
        let pieces: Vec<String> = attributes.iter().map(ToString::to_string).collect();
        let key = canonical_key(&resolve_favorite(catalog, &pieces), catalog);
        wire(number, key, attributes)
    }

    // Tests an edit that would duplicate another image is refused without side effects
    // Verified by ignoring the key index when replacing the favorite
    #[test]
    fn test_favorite_edit_keeps_keys_unique() {
        let catalog = catalog();
        let mut collection = Collection::new(Arc::clone(&catalog), 1, 2);
        collection.merge(
            1,
            vec![keyed(&catalog, 1, &["a1", "b1"]), keyed(&catalog, 2, &["a1", "b2"])],
        );
        let id = collection.images().first().expect("Missing image").id;
        let mut favorites = FavoriteBag::new();
        let marked = collection
            .toggle_favorite(id, &mut favorites)
            .expect("Image should exist")
            .clone();
        let favorite = marked.favorite().expect("Image should be a favorite").to_string();

        let b2 = catalog.piece_index("b2").expect("Unknown piece");
        assert!(collection.update_favorite(id, &mut favorites, 1, Some(b2)).is_none());

        let current = collection.image(id).expect("Image should exist");
        assert_eq!(current.image, marked);
        assert_eq!(
            favorites.get(&favorite),
            Some(["a1".to_string(), "b1".to_string()].as_slice())
        );

        let a2 = catalog.piece_index("a2").expect("Unknown piece");
        let moved = collection
            .update_favorite(id, &mut favorites, 0, Some(a2))
            .expect("Favorite should update")
            .key();
        let keys: std::collections::HashSet<u64> =
            collection.images().iter().map(|entry| entry.image.key()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&moved));
    }

    // Tests a piece is only swapped into its own layer
    // Verified by placing the piece at the requested layer unchecked
    #[test]
    fn test_favorite_edit_rejects_foreign_piece() {
        let catalog = catalog();
        let mut collection = Collection::new(Arc::clone(&catalog), 1, 1);
        collection.merge(1, vec![keyed(&catalog, 1, &["a1", "b1"])]);
        let id = collection.images().first().expect("Missing image").id;
        let mut favorites = FavoriteBag::new();
        collection.toggle_favorite(id, &mut favorites);

        let a2 = catalog.piece_index("a2").expect("Unknown piece");
        assert!(collection.update_favorite(id, &mut favorites, 1, Some(a2)).is_none());
        let current = collection.image(id).expect("Image should exist");
        assert_eq!(current.image.attribute_ids(&catalog), vec!["a1", "b1"]);
    }

    // Tests favoriting, editing and unfavoriting through the collection
    // Verified by leaving the key index stale after an update
    #[test]
    fn test_favorite_editing() {
        let mut collection = Collection::new(catalog(), 1, 2);
        collection.merge(1, vec![wire(1, 1, &["a1", "b1"])]);
        let id = collection.images().first().expect("Missing image").id;
        let mut favorites = FavoriteBag::new();

        let marked = collection
            .toggle_favorite(id, &mut favorites)
            .expect("Image should exist");
        assert!(marked.favorite().is_some());
        assert_eq!(favorites.len(), 1);

        let b2 = collection.catalog().piece_index("b2").expect("Unknown piece");
        let updated_key = collection
            .update_favorite(id, &mut favorites, 1, Some(b2))
            .expect("Favorite should update")
            .key();
        assert_ne!(updated_key, 1);

        assert_eq!(collection.merge(1, vec![wire(2, 1, &["a2"])]), 1);
        assert_eq!(collection.merge(1, vec![wire(2, updated_key, &["a2"])]), 0);

        let unmarked = collection
            .toggle_favorite(id, &mut favorites)
            .expect("Image should exist");
        assert!(unmarked.favorite().is_none());
        assert!(favorites.is_empty());
    }

    // Tests the export keeps identifiers and favorite marks
    // Verified by exporting piece indices instead of identifiers
    #[test]
    fn test_export() {
        let mut collection = Collection::new(catalog(), 1, 1);
        let mut image = wire(1, 5, &["a2", "b2"]);
        image.favorite = Some("fav".to_string());
        collection.merge(1, vec![image]);

        let exported = collection.export();
        let entry = exported.first().expect("Missing export");
        assert_eq!(entry.number, 1);
        assert_eq!(entry.key, 5);
        assert_eq!(entry.favorite.as_deref(), Some("fav"));
        assert_eq!(entry.attributes, vec!["a2", "b2"]);

        let json = serde_json::to_value(&exported).expect("Failed to encode");
        assert!(json.get(0).and_then(|value| value.get("id")).is_some());
    }
}
