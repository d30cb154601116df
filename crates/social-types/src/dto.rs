//! Request and response DTOs for the social graph surface.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Body of `follow` / `unfollow`. The caller comes from the auth context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    #[serde(alias = "target_id")]
    pub target_id: UserId,
}

/// Input of `getFollowers` / `getFollowing` / `getFriends`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    /// Defaults to the caller when omitted.
    #[serde(default, alias = "user_id")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl ListRequest {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Listing subject: `user_id` or the caller.
    pub fn target_or(&self, caller: UserId) -> UserId {
        self.user_id.unwrap_or(caller)
    }
}

/// Input of `counts`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<UserId>,
}

/// Output of `unfollow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfollowResponse {
    pub success: bool,
}

/// Response envelope used by the REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    /// Error tag such as `ALREADY_FOLLOWING`; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(code: i32, tag: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            error: Some(tag.to_string()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_request_defaults_to_caller() {
        let req: ListRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.target_or(UserId::new(3)), UserId::new(3));
        assert!(req.limit.is_none());
        assert!(req.cursor.is_none());

        let req = ListRequest::for_user(UserId::new(9)).with_limit(5);
        assert_eq!(req.target_or(UserId::new(3)), UserId::new(9));
        assert_eq!(req.limit, Some(5));
    }

    #[test]
    fn requests_use_camel_case_and_accept_snake_case() {
        let req: TargetRequest = serde_json::from_str(r#"{"targetId": 20}"#).unwrap();
        assert_eq!(req.target_id, UserId::new(20));
        let req: TargetRequest = serde_json::from_str(r#"{"target_id": 21}"#).unwrap();
        assert_eq!(req.target_id, UserId::new(21));
        assert_eq!(
            serde_json::to_value(TargetRequest { target_id: UserId::new(5) }).unwrap(),
            serde_json::json!({ "targetId": 5 })
        );

        let req: ListRequest =
            serde_json::from_str(r#"{"userId": 7, "limit": 3, "cursor": "abc"}"#).unwrap();
        assert_eq!(req.user_id, Some(UserId::new(7)));
        let req: ListRequest = serde_json::from_str(r#"{"user_id": 8}"#).unwrap();
        assert_eq!(req.user_id, Some(UserId::new(8)));

        let req: CountsRequest = serde_json::from_str(r#"{"userId": 9}"#).unwrap();
        assert_eq!(req.user_id, Some(UserId::new(9)));
    }

    #[test]
    fn failure_envelope_omits_data() {
        let res: BaseResponse<()> = BaseResponse::failure(409, "ALREADY_FOLLOWING", "dup");
        let j = serde_json::to_value(&res).unwrap();
        assert_eq!(j["code"], 409);
        assert_eq!(j["error"], "ALREADY_FOLLOWING");
        assert!(j.get("data").is_none());
    }
}
