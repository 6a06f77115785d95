// Code generated by protoschema. DO NOT EDIT.
//
// Source: shop/v1/order.proto
// Generator version: 0.1.0

#![allow(non_snake_case)]

use protoschema_core::{Definitions, InstanceType, Schema};

/// JSON Schema for the `Order` message.
pub fn Order_json_schema() -> Schema {
    let mut defs = Definitions::new();
    let _ = Order_json_schema_with_defs(&mut defs);
    Schema::root_reference("shop.v1.Order", defs)
}

pub fn Order_json_schema_with_defs(defs: &mut Definitions) -> Schema {
    if defs.contains_key("shop.v1.Order") {
        return Schema::reference("shop.v1.Order");
    }
    // Register first so self-references resolve to a $ref.
    defs.insert("shop.v1.Order".to_string(), Schema::default());

    let schema = Schema {
        instance_type: Some(InstanceType::Object),
        title: Some("Order".to_string()),
        description: Some("A customer order.".to_string()),
        properties: [
            ("email".to_string(), Schema {
                instance_type: Some(InstanceType::String),
                ..Schema::default()
            }),
            ("flags".to_string(), Schema {
                instance_type: Some(InstanceType::Object),
                additional_properties: Some(Box::new(Schema {
                    instance_type: Some(InstanceType::String),
                    ..Schema::default()
                })),
                property_names: Some(Box::new(Schema {
                    pattern: Some("^(true|false)$".to_string()),
                    ..Schema::default()
                })),
                ..Schema::default()
            }),
            ("id".to_string(), Schema {
                instance_type: Some(InstanceType::String),
                min_length: Some(1),
                ..Schema::default()
            }),
            ("lines".to_string(), Schema {
                instance_type: Some(InstanceType::Object),
                additional_properties: Some(Box::new(Order_Line_json_schema_with_defs(defs))),
                property_names: Some(Box::new(Schema {
                    pattern: Some("^-?[0-9]+$".to_string()),
                    ..Schema::default()
                })),
                ..Schema::default()
            }),
            ("parent".to_string(), Order_json_schema_with_defs(defs)),
            ("phone".to_string(), Schema {
                instance_type: Some(InstanceType::String),
                ..Schema::default()
            }),
            ("placed_at".to_string(), order_google_protobuf_Timestamp_json_schema_with_defs(defs)),
            ("receipt".to_string(), Schema {
                instance_type: Some(InstanceType::String),
                content_encoding: Some("base64".to_string()),
                ..Schema::default()
            }),
            ("status".to_string(), Schema {
                instance_type: Some(InstanceType::Integer),
                enum_values: vec![0, 1],
                ..Schema::default()
            }),
            ("total".to_string(), Schema {
                instance_type: Some(InstanceType::Number),
                exclusive_minimum: Some(1.0),
                ..Schema::default()
            }),
        ]
        .into_iter()
        .collect(),
        required: vec!["id".to_string(), "status".to_string(), "receipt".to_string(), "total".to_string(), "placed_at".to_string()],
        one_of: vec![
            Schema {
                required: vec!["email".to_string()],
                ..Schema::default()
            },
            Schema {
                required: vec!["phone".to_string()],
                ..Schema::default()
            },
        ],
        ..Schema::default()
    };
    defs.insert("shop.v1.Order".to_string(), schema);
    Schema::reference("shop.v1.Order")
}

/// JSON Schema for the `Line` message.
pub fn Order_Line_json_schema() -> Schema {
    let mut defs = Definitions::new();
    let _ = Order_Line_json_schema_with_defs(&mut defs);
    Schema::root_reference("shop.v1.Order.Line", defs)
}

pub fn Order_Line_json_schema_with_defs(defs: &mut Definitions) -> Schema {
    if defs.contains_key("shop.v1.Order.Line") {
        return Schema::reference("shop.v1.Order.Line");
    }
    // Register first so self-references resolve to a $ref.
    defs.insert("shop.v1.Order.Line".to_string(), Schema::default());

    let schema = Schema {
        instance_type: Some(InstanceType::Object),
        properties: [
            ("quantity".to_string(), Schema {
                instance_type: Some(InstanceType::Integer),
                ..Schema::default()
            }),
            ("sku".to_string(), Schema {
                instance_type: Some(InstanceType::String),
                ..Schema::default()
            }),
        ]
        .into_iter()
        .collect(),
        required: vec!["sku".to_string(), "quantity".to_string()],
        ..Schema::default()
    };
    defs.insert("shop.v1.Order.Line".to_string(), schema);
    Schema::reference("shop.v1.Order.Line")
}

/// JSON Schema for the shared `google.protobuf.Timestamp` message.
pub fn order_google_protobuf_Timestamp_json_schema() -> Schema {
    let mut defs = Definitions::new();
    let _ = order_google_protobuf_Timestamp_json_schema_with_defs(&mut defs);
    Schema::root_reference("google.protobuf.Timestamp", defs)
}

pub fn order_google_protobuf_Timestamp_json_schema_with_defs(defs: &mut Definitions) -> Schema {
    if defs.contains_key("google.protobuf.Timestamp") {
        return Schema::reference("google.protobuf.Timestamp");
    }
    // Register first so self-references resolve to a $ref.
    defs.insert("google.protobuf.Timestamp".to_string(), Schema::default());

    let schema = Schema {
        instance_type: Some(InstanceType::Object),
        properties: [
            ("nanos".to_string(), Schema {
                instance_type: Some(InstanceType::Integer),
                ..Schema::default()
            }),
            ("seconds".to_string(), Schema {
                instance_type: Some(InstanceType::Integer),
                ..Schema::default()
            }),
        ]
        .into_iter()
        .collect(),
        required: vec!["seconds".to_string(), "nanos".to_string()],
        ..Schema::default()
    };
    defs.insert("google.protobuf.Timestamp".to_string(), schema);
    Schema::reference("google.protobuf.Timestamp")
}
