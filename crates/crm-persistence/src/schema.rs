// Esquema Diesel para SQLite. Ids enteros (rowid) y marcas de tiempo en
// milisegundos en columnas `*_ts`.
use diesel::allow_tables_to_appear_in_same_query;
use diesel::joinable;

diesel::table! {
    roles (id) {
        id -> BigInt,
        name -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        username -> Text,
        email -> Text,
        role_id -> BigInt,
        created_at_ts -> BigInt,
    }
}

diesel::table! {
    contacts (id) {
        id -> BigInt,
        first_name -> Text,
        last_name -> Text,
        email -> Nullable<Text>,
        primary_phone -> Text,
        created_by -> Nullable<BigInt>,
        created_at_ts -> BigInt,
    }
}

diesel::table! {
    properties (id) {
        id -> BigInt,
        name -> Text,
        site_id -> BigInt,
        property_type_id -> BigInt,
        unit_no -> Nullable<Text>,
        size_sqft -> Nullable<Double>,
        price -> Double,
        status -> Text,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}

diesel::table! {
    leads (id) {
        id -> BigInt,
        contact_id -> BigInt,
        property_id -> Nullable<BigInt>,
        source_id -> BigInt,
        status_id -> BigInt,
        assigned_to -> BigInt,
        notes -> Nullable<Text>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}

diesel::table! {
    deals (id) {
        id -> BigInt,
        lead_id -> BigInt,
        property_id -> BigInt,
        stage_id -> BigInt,
        deal_status -> Text,
        deal_amount -> Double,
        deal_date_ts -> BigInt,
        closing_date_ts -> Nullable<BigInt>,
        notes -> Nullable<Text>,
        created_by -> Nullable<BigInt>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}

diesel::table! {
    tasks (id) {
        id -> BigInt,
        task_name -> Text,
        task_description -> Nullable<Text>,
        due_date_ts -> BigInt,
        status -> Text,
        assigned_to -> BigInt,
        lead_id -> Nullable<BigInt>,
        deal_id -> Nullable<BigInt>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}

joinable!(deals -> leads (lead_id));
joinable!(leads -> contacts (contact_id));
joinable!(leads -> users (assigned_to));

allow_tables_to_appear_in_same_query!(roles, users, contacts, properties, leads, deals, tasks);
