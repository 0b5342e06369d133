//! Feature service response fixtures

use serde_json::{Value, json};

/// Epoch milliseconds for 2023/11/14 22:13:20 UTC
pub const SALE_DATE_MILLIS: i64 = 1_700_000_000_000;

/// One synthetic foreclosure feature with every schema column populated
pub fn foreclosure_attributes(object_id: u64) -> Value {
    json!({
        "House_Nr": 100 + object_id,
        "Dir": null,
        "Street_Name": "BARDSTOWN",
        "St_Type": "RD",
        "Post_Dir": null,
        "Zip": "40205",
        "L_S": "L",
        "CD": 8,
        "Neighborhood": "HIGHLANDS",
        "Full_Parcel_ID": format!("0{:09}", object_id),
        "Census_Tract": 70,
        "Action_Filed": 0,
        "Case_": format!("23CI{:06}", object_id),
        "Case_Style": "BANK, N.A. VS DOE",
        "Sale_Date": SALE_DATE_MILLIS,
        "Sale_Price": 85000.5,
        "Purchaser": "PLAINTIFF",
        "ObjectId": object_id,
        "Shape__Area": 1234.5
    })
}

/// Query response body holding `count` features with ids starting at `first_id`
pub fn feature_page(first_id: u64, count: u64) -> Value {
    let features: Vec<Value> = (first_id..first_id + count)
        .map(|id| json!({ "attributes": foreclosure_attributes(id) }))
        .collect();
    json!({
        "objectIdFieldName": "ObjectId",
        "features": features,
        "exceededTransferLimit": count > 0
    })
}

/// Query response body with no features, the end-of-data page
pub fn empty_page() -> Value {
    json!({ "objectIdFieldName": "ObjectId", "features": [] })
}

/// Error object the service returns with HTTP 200 for a rejected query
pub fn service_error_body() -> Value {
    json!({
        "error": {
            "code": 400,
            "message": "Cannot perform query. Invalid query parameters.",
            "details": ["Unable to perform query. Please check your parameters."]
        }
    })
}
