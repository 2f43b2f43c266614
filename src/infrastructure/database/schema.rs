// Both sink tables share one layout; see migrations/.

diesel::table! {
    use diesel::sql_types::*;
    use pgvector::sql_types::*;

    report_chunks (id) {
        id -> Uuid,
        accountant_id -> Text,
        client_id -> Text,
        source_filename -> Text,
        chunk_index -> Int4,
        sequence_text -> Text,
        embedding -> Vector,
        category -> Nullable<Text>,
        note -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use pgvector::sql_types::*;

    chat_chunks (id) {
        id -> Uuid,
        accountant_id -> Text,
        client_id -> Text,
        source_filename -> Text,
        chunk_index -> Int4,
        sequence_text -> Text,
        embedding -> Vector,
        category -> Nullable<Text>,
        note -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(report_chunks, chat_chunks);
