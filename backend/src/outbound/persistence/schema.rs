//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Accounts for receptors, emissors and administrators.
    users (id) {
        id -> Uuid,
        /// Lower-cased, unique.
        email -> Varchar,
        display_name -> Varchar,
        /// `receptor`, `emissor` or `admin`.
        role -> Varchar,
        active -> Bool,
        /// Argon2 PHC string.
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Uploaded file metadata; the bytes live in the storage backend.
    files (id) {
        id -> Uuid,
        owner_id -> Uuid,
        original_name -> Varchar,
        content_type -> Varchar,
        size_bytes -> Int8,
        /// `local` or `cloudinary`.
        storage_backend -> Varchar,
        storage_key -> Text,
        public_url -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reports (id) {
        id -> Uuid,
        emissor_id -> Uuid,
        receptor_id -> Uuid,
        file_id -> Uuid,
        title -> Varchar,
        protocol -> Nullable<Varchar>,
        /// `sent`, `viewed` or `archived`.
        status -> Varchar,
        sent_at -> Timestamptz,
        viewed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        report_id -> Uuid,
        /// `unread` or `archived`.
        status -> Varchar,
        created_at -> Timestamptz,
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    professionals (id) {
        id -> Uuid,
        owner_id -> Uuid,
        name -> Varchar,
        specialty -> Varchar,
        registry_number -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    health_events (id) {
        id -> Uuid,
        owner_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        kind -> Varchar,
        starts_at -> Timestamptz,
        ends_at -> Nullable<Timestamptz>,
        /// Set to NULL when the professional is deleted.
        professional_id -> Nullable<Uuid>,
        file_ids -> Array<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Time-limited public links; only the SHA-256 of the token is stored.
    share_links (id) {
        id -> Uuid,
        owner_id -> Uuid,
        token_hash -> Bpchar,
        file_ids -> Array<Uuid>,
        expires_at -> Timestamptz,
        max_accesses -> Nullable<Int4>,
        access_count -> Int4,
        revoked_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only; the application role holds INSERT and SELECT only.
    audit_log (id) {
        id -> Uuid,
        actor_id -> Nullable<Uuid>,
        action -> Varchar,
        resource_type -> Varchar,
        resource_id -> Nullable<Uuid>,
        ip -> Nullable<Varchar>,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(files -> users (owner_id));
diesel::joinable!(reports -> files (file_id));
diesel::joinable!(notifications -> reports (report_id));
diesel::joinable!(health_events -> professionals (professional_id));

diesel::allow_tables_to_appear_in_same_query!(
    audit_log,
    files,
    health_events,
    notifications,
    professionals,
    reports,
    share_links,
    users,
);
