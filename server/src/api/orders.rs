//! Order endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{OrderId, OrderStatus, OrderView};

use crate::db;
use crate::db::query::{Filter, ListQuery, Page, SortDir};
use crate::email;
use crate::error::ServiceError;
use crate::orders::{EditField, create, status};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Buyer identity resolved by the auth layer in front of this service
fn student_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-student-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Listing parameters; `search_column`/`search_value` are parallel JSON
/// arrays so several filters combine with AND
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search_column: Option<String>,
    pub search_value: Option<String>,
    pub sort_column: Option<String>,
    pub sort_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn parse_list_params(params: ListParams) -> Result<ListQuery, AppError> {
    let mut query = ListQuery::default();

    match (params.search_column, params.search_value) {
        (Some(columns), Some(values)) => {
            let columns: Vec<String> = serde_json::from_str(&columns)
                .map_err(|_| AppError::invalid_request("search_column must be a JSON array"))?;
            let values: Vec<String> = serde_json::from_str(&values)
                .map_err(|_| AppError::invalid_request("search_value must be a JSON array"))?;
            if columns.len() != values.len() {
                return Err(AppError::invalid_request(
                    "search_column and search_value must have the same length",
                ));
            }
            for (column, value) in columns.into_iter().zip(values) {
                query.filters.push(Filter {
                    column: column.parse()?,
                    value,
                });
            }
        }
        (None, None) => {}
        _ => {
            return Err(AppError::invalid_request(
                "search_column and search_value must be supplied together",
            ));
        }
    }

    if let Some(column) = params.sort_column {
        let dir = match params.sort_type {
            Some(dir) => dir.parse()?,
            None => SortDir::Desc,
        };
        query.sort = Some((column.parse()?, dir));
    }

    if let (Some(page), Some(limit)) = (params.page, params.limit) {
        query.page = Some(Page { page, limit });
    }

    Ok(query)
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<OrderView>> {
    let query = parse_list_params(params)?;
    let (views, total) = db::orders::list_views(&state.pool, &query).await?;
    Ok(Json(ApiResponse::success_with_count(views, total)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OrderView> {
    let id: OrderId = id.parse()?;
    let view = db::orders::find_view_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_order_by_public_id(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> ApiResult<OrderView> {
    let view = db::orders::find_view_by_public_id(&state.pool, &public_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(ApiResponse::success(view)))
}

#[derive(Debug, Deserialize)]
pub struct ReferenceParams {
    pub student_id: Option<String>,
}

pub async fn get_order_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(params): Query<ReferenceParams>,
) -> ApiResult<OrderView> {
    let view =
        db::orders::find_view_by_reference(&state.pool, &reference, params.student_id.as_deref())
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_order_proof(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<shared::models::PaymentProof> {
    let proof = db::proofs::find_by_reference(&state.pool, &reference)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::not_found("Payment proof"))?;
    Ok(Json(ApiResponse::success(proof)))
}

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<create::CreateOrderRequest>,
) -> ApiResult<OrderView> {
    let order = create::validate(req, student_id(&headers))?;
    let view = create::create_order(&state, order).await?;

    email::spawn_confirmation(&state, view.clone());

    Ok(Json(ApiResponse::success_with_message("Order created", view)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub value: Value,
}

fn value_as_string(value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(AppError::invalid_request("value must be a string or number")),
    }
}

/// Update one field of an order. `status` routes through the transition
/// engine so stock stays reconciled; other keys must pass the edit
/// allow-list.
pub async fn update_order(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<OrderView> {
    let id: OrderId = id.parse()?;
    let raw = value_as_string(&body.value)?;

    if key == "status" {
        let to = raw
            .parse::<i16>()
            .map_err(|_| {
                AppError::with_message(
                    ErrorCode::InvalidStatusKey,
                    format!("Unknown order status: {raw}"),
                )
            })
            .and_then(OrderStatus::try_from)?;
        let outcome = status::transition(&state, id, to).await?;

        let view = db::orders::find_view_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

        if outcome.changed() && outcome.to == OrderStatus::Completed {
            email::spawn_receipt(&state, view.clone());
        }
        return Ok(Json(ApiResponse::success(view)));
    }

    let field: EditField = key.parse()?;
    let value = field.parse_value(&raw)?;
    let affected = db::orders::update_field(&state.pool, id, field.column(), value)
        .await
        .map_err(ServiceError::from)?;
    if affected == 0 {
        return Err(AppError::new(ErrorCode::OrderNotFound));
    }

    let view = db::orders::find_view_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(ApiResponse::success(view)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::OrderColumn;

    fn params() -> ListParams {
        ListParams {
            search_column: None,
            search_value: None,
            sort_column: None,
            sort_type: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_parse_empty_params() {
        let query = parse_list_params(params()).unwrap();
        assert!(query.filters.is_empty());
        assert!(query.sort.is_none());
        assert!(query.page.is_none());
    }

    #[test]
    fn test_parse_filters() {
        let mut p = params();
        p.search_column = Some(r#"["status","last_name"]"#.into());
        p.search_value = Some(r#"["1","cruz"]"#.into());
        let query = parse_list_params(p).unwrap();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].column, OrderColumn::Status);
        assert_eq!(query.filters[1].value, "cruz");
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        let mut p = params();
        p.search_column = Some(r#"["status"]"#.into());
        p.search_value = Some(r#"["1","2"]"#.into());
        assert_eq!(
            parse_list_params(p).unwrap_err().code,
            ErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_parse_rejects_lone_search_half() {
        let mut p = params();
        p.search_value = Some(r#"["1"]"#.into());
        assert!(parse_list_params(p).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_sort_column() {
        let mut p = params();
        p.sort_column = Some("password".into());
        assert_eq!(
            parse_list_params(p).unwrap_err().code,
            ErrorCode::KeyNotAllowed
        );
    }

    #[test]
    fn test_parse_sort_defaults_desc() {
        let mut p = params();
        p.sort_column = Some("created_at".into());
        let query = parse_list_params(p).unwrap();
        assert_eq!(query.sort, Some((OrderColumn::CreatedAt, SortDir::Desc)));
    }

    #[test]
    fn test_value_as_string() {
        assert_eq!(value_as_string(&Value::String("x".into())).unwrap(), "x");
        assert_eq!(value_as_string(&serde_json::json!(3)).unwrap(), "3");
        assert!(value_as_string(&serde_json::json!({"a": 1})).is_err());
    }

    #[test]
    fn test_student_id_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(student_id(&headers), None);
        headers.insert("x-student-id", "2021-00123".parse().unwrap());
        assert_eq!(student_id(&headers), Some("2021-00123".into()));
        headers.insert("x-student-id", "".parse().unwrap());
        assert_eq!(student_id(&headers), None);
    }
}
