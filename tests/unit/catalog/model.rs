//! Tests for catalog construction, lookups and combination counting

#[cfg(test)]
mod tests {
    use greedylayers::GenerationError;
    use greedylayers::catalog::model::Catalog;
    use greedylayers::catalog::request::RunRequest;

    fn catalog(json: &str) -> Result<Catalog, GenerationError> {
        let request = RunRequest::from_json_str(json).expect("Failed to parse request");
        Catalog::from_request(&request)
    }

    const SAMPLE: &str = r#"{ "layers": [
        { "id": "bg", "required": true, "tags": ["scene"], "pieces": [
            { "id": "sky", "tags": ["blue"] },
            { "id": "sea", "tags": ["blue"], "blockedTags": ["fire"], "limit": 2 }
        ] },
        { "id": "empty", "pieces": [] },
        { "id": "fx", "pieces": [{ "id": "flame", "tags": ["fire"] }] }
    ], "size": 1 }"#;

    // Tests empty layers are dropped before indices are assigned
    // Verified by keeping layers without pieces
    #[test]
    fn test_empty_layers_dropped() {
        let catalog = catalog(SAMPLE).expect("Failed to build catalog");
        assert_eq!(catalog.layers().len(), 2);
        assert_eq!(catalog.layer_index("fx"), Some(1));
        assert_eq!(catalog.layer_index("empty"), None);
    }

    // Tests pieces are indexed globally and point back at their layer
    // Verified by numbering pieces per layer
    #[test]
    fn test_piece_arena() {
        let catalog = catalog(SAMPLE).expect("Failed to build catalog");
        let flame = catalog.piece_index("flame").expect("Unknown piece");
        assert_eq!(flame, 2);
        assert_eq!(catalog.piece(flame).map(|piece| piece.layer), Some(1));
        assert_eq!(catalog.layer(0).map(|layer| layer.pieces.clone()), Some(vec![0, 1]));

        let sea = catalog.piece(1).expect("Missing piece");
        assert_eq!(sea.limit, Some(2));
        assert!(catalog.layer(0).is_some_and(|layer| layer.required));
    }

    // Tests tags are interned once and shared by every set
    // Verified by interning tags per layer
    #[test]
    fn test_tag_interning() {
        let catalog = catalog(SAMPLE).expect("Failed to build catalog");
        assert_eq!(catalog.tag_count(), 3);

        let fire: Vec<usize> = (0..catalog.tag_count())
            .filter(|&tag| catalog.tag_name(tag) == Some("fire"))
            .collect();
        let sea = catalog.piece(1).expect("Missing piece");
        let flame = catalog.piece(2).expect("Missing piece");
        assert_eq!(sea.blocked_tags.to_vec(), fire);
        assert_eq!(flame.tags.to_vec(), fire);
        assert!(sea.blocked_tags.intersects(&flame.tags));
        assert_eq!(catalog.tag_name(99), None);
    }

    // Tests duplicate identifiers are rejected
    // Verified by overwriting the earlier lookup entry
    #[test]
    fn test_duplicate_ids_rejected() {
        let duplicate_piece = catalog(
            r#"{ "layers": [
                { "id": "a", "pieces": [{ "id": "p" }] },
                { "id": "b", "pieces": [{ "id": "p" }] }
            ], "size": 1 }"#,
        );
        assert!(matches!(duplicate_piece, Err(GenerationError::InvalidCatalog { .. })));

        let duplicate_layer = catalog(
            r#"{ "layers": [
                { "id": "a", "pieces": [{ "id": "p" }] },
                { "id": "a", "pieces": [{ "id": "q" }] }
            ], "size": 1 }"#,
        );
        assert!(matches!(duplicate_layer, Err(GenerationError::InvalidCatalog { .. })));
    }

    // Tests the combination count honours required and excluded layers
    // Verified by counting the skip option for required layers
    #[test]
    fn test_combination_count() {
        let catalog = catalog(
            r#"{ "layers": [
                { "id": "a", "required": true, "pieces": [{ "id": "a1" }, { "id": "a2" }] },
                { "id": "b", "pieces": [{ "id": "b1" }, { "id": "b2" }] },
                { "id": "c", "excludeFromKey": true, "pieces": [{ "id": "c1" }, { "id": "c2" }] }
            ], "size": 1 }"#,
        )
        .expect("Failed to build catalog");
        assert_eq!(catalog.combination_count(), 6);

        let empty = Catalog::from_layers(&[]).expect("Empty catalog is valid");
        assert_eq!(empty.combination_count(), 0);
    }
}
