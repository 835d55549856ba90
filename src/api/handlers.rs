use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, warn};

use super::error::ApiError;
use super::http::{Request, Response};
use super::validation::{
    is_date_shaped, parse_body, validate_new_workout, validate_replacement,
};
use crate::db::{
    delete_workout_by_id, fetch_workout, list_workouts_by_date, replace_workout, save_workout,
    Database,
};
use crate::models::DATE_FORMAT;

/// Resolve one request against the store. Never fails: every error is turned
/// into its JSON response here.
pub fn handle_request(database: &Database, request: &Request) -> Response {
    match route(database, request) {
        Ok(response) => response,
        Err(err) => {
            if err.status() >= 500 {
                warn!(method = %request.method, path = %request.path, error = %err, "request failed");
            } else {
                debug!(method = %request.method, path = %request.path, error = %err, "request rejected");
            }
            err.into_response()
        }
    }
}

fn route(database: &Database, request: &Request) -> Result<Response, ApiError> {
    let method = request.method.as_str();
    if method == "OPTIONS" {
        return Ok(Response::empty(204));
    }

    let path = strip_api_prefix(&request.path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["health"] => match method {
            "GET" => Ok(Response::json(200, json!({ "status": "healthy" }))),
            _ => Err(ApiError::MethodNotAllowed),
        },
        ["workouts"] => match method {
            "GET" => list_workouts(database, request),
            "POST" => create_workout(database, request),
            _ => Err(ApiError::MethodNotAllowed),
        },
        ["workouts", raw_id] => {
            let id = raw_id
                .parse::<i64>()
                .map_err(|_| ApiError::NotFound("Not found".into()))?;
            match method {
                "PUT" => update_workout(database, id, request),
                "DELETE" => delete_workout(database, id),
                _ => Err(ApiError::MethodNotAllowed),
            }
        }
        _ => Err(ApiError::NotFound("Not found".into())),
    }
}

/// Routes are served both bare and under `/api`.
fn strip_api_prefix(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

fn list_workouts(database: &Database, request: &Request) -> Result<Response, ApiError> {
    let Some(raw) = request.query_param("date") else {
        return Ok(Response::json(200, json!({ "data": [] })));
    };
    if !is_date_shaped(&raw) {
        return Err(ApiError::bad_request("Invalid date format"));
    }
    // Shaped like a date but not on the calendar: nothing can be stored there.
    let Ok(date) = NaiveDate::parse_from_str(&raw, DATE_FORMAT) else {
        return Ok(Response::json(200, json!({ "data": [] })));
    };

    let failed = ApiError::internal("Failed to fetch workouts");
    let workouts = database
        .connect()
        .and_then(|conn| list_workouts_by_date(&conn, date))
        .map_err(failed)?;
    Ok(Response::json(200, json!({ "data": workouts })))
}

fn create_workout(database: &Database, request: &Request) -> Result<Response, ApiError> {
    let body = parse_body(&request.body)?;
    let draft = validate_new_workout(&body)?;

    let failed = ApiError::internal("Failed to create workout");
    let id = database
        .connect()
        .and_then(|mut conn| save_workout(&mut conn, &draft))
        .map_err(failed)?;

    Ok(Response::json(
        201,
        json!({
            "message": "Workout created successfully",
            "id": id,
            "data": body,
        }),
    ))
}

/// Replace-tree update: the stored workout is deleted and the payload saved
/// in its place under a new id, the same way the terminal form edits.
fn update_workout(database: &Database, id: i64, request: &Request) -> Result<Response, ApiError> {
    let body = parse_body(&request.body)?;
    let replacement = validate_replacement(&body)?;

    let mut conn = database
        .connect()
        .map_err(ApiError::internal("Failed to update workout"))?;
    let current = fetch_workout(&conn, id)
        .map_err(ApiError::internal("Failed to update workout"))?
        .ok_or_else(|| ApiError::NotFound("Workout not found".into()))?;

    let draft = replacement.into_draft(&current);
    let new_id = replace_workout(&mut conn, id, &draft)
        .map_err(ApiError::internal("Failed to update workout"))?
        .ok_or_else(|| ApiError::NotFound("Workout not found".into()))?;

    Ok(Response::json(
        200,
        json!({
            "message": "Workout updated successfully",
            "id": new_id,
            "data": body,
        }),
    ))
}

fn delete_workout(database: &Database, id: i64) -> Result<Response, ApiError> {
    let failed = ApiError::internal("Failed to delete workout");
    let existed = database
        .connect()
        .and_then(|mut conn| delete_workout_by_id(&mut conn, id))
        .map_err(failed)?;

    if existed {
        Ok(Response::json(
            200,
            json!({ "message": "Workout deleted successfully" }),
        ))
    } else {
        Err(ApiError::NotFound("Workout not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_prefix_is_optional() {
        assert_eq!(strip_api_prefix("/api/workouts"), "/workouts");
        assert_eq!(strip_api_prefix("/workouts"), "/workouts");
        assert_eq!(strip_api_prefix("/apiary"), "/apiary");
        assert_eq!(strip_api_prefix("/api"), "");
    }
}
