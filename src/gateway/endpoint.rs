//! Logical endpoint routing
//!
//! The request surface accepts slash-delimited logical paths. Routing is a
//! closed set of variants dispatched by pattern match; anything outside the
//! set fails closed with `Endpoint not implemented: <path>` rather than
//! silently no-opping.

use crate::error::ApiError;

/// HTTP-style method for the dynamic request surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            other => Err(ApiError::validation(format!(
                "Unsupported method: {}",
                other
            ))),
        }
    }
}

/// The closed set of operations the gateway can route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Register,
    Login,
    CurrentUser,
    VerifyToken,
    UpdateMetadata { user_id: String },
    ApplyTeacher { user_id: String },
    ListCourses,
    GetCourse { id: String },
    SearchCourses { query: String },
    CoursesByCategory { category: String },
    CreateCourse,
    UpdateCourse { id: String },
    DeleteCourse { id: String },
    TeacherCourses,
    UploadMedia,
    HealthCheck,
}

impl Endpoint {
    /// Route a logical path and method onto an endpoint.
    ///
    /// Unroutable combinations produce `ApiError::UnimplementedEndpoint`
    /// carrying the full original path.
    pub fn parse(path: &str, method: Method) -> Result<Self, ApiError> {
        let (route, query_string) = match path.split_once('?') {
            Some((route, qs)) => (route, qs),
            None => (path, ""),
        };
        let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();

        use Method::*;
        let endpoint = match (segments.as_slice(), method) {
            (["auth", "register"], Post) => Endpoint::Register,
            (["auth", "login"], Post) => Endpoint::Login,
            (["auth", "current-user"], Get) => Endpoint::CurrentUser,
            (["auth", "verify-token"], Get) => Endpoint::VerifyToken,
            (["auth", "users", id, "metadata"], Put) => Endpoint::UpdateMetadata {
                user_id: (*id).to_string(),
            },
            (["auth", "users", id, "apply-teacher"], Post) => Endpoint::ApplyTeacher {
                user_id: (*id).to_string(),
            },
            (["courses"], Get) => Endpoint::ListCourses,
            (["courses", "search"], Get) => Endpoint::SearchCourses {
                query: query_param(query_string, "q"),
            },
            (["courses", "category", category], Get) => Endpoint::CoursesByCategory {
                category: decode_component(category),
            },
            (["courses", id], Get) => Endpoint::GetCourse {
                id: (*id).to_string(),
            },
            (["admin", "courses"], Post) => Endpoint::CreateCourse,
            (["admin", "courses", id], Put) => Endpoint::UpdateCourse {
                id: (*id).to_string(),
            },
            (["admin", "courses", id], Delete) => Endpoint::DeleteCourse {
                id: (*id).to_string(),
            },
            (["teacher", "courses"], Get) => Endpoint::TeacherCourses,
            (["upload"], Post) => Endpoint::UploadMedia,
            (["health-check"], Get) => Endpoint::HealthCheck,
            _ => return Err(ApiError::UnimplementedEndpoint(path.to_string())),
        };
        Ok(endpoint)
    }
}

/// Extract one query parameter value, decoded. Missing parameter yields "".
fn query_param(query_string: &str, name: &str) -> String {
    query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| decode_component(value))
        .unwrap_or_default()
}

/// Minimal percent-decoding for path and query components.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    // Malformed escapes pass through verbatim.
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|v| v as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_auth_endpoints() {
        assert_eq!(
            Endpoint::parse("/auth/register", Method::Post).unwrap(),
            Endpoint::Register
        );
        assert_eq!(
            Endpoint::parse("/auth/login", Method::Post).unwrap(),
            Endpoint::Login
        );
        assert_eq!(
            Endpoint::parse("/auth/current-user", Method::Get).unwrap(),
            Endpoint::CurrentUser
        );
        assert_eq!(
            Endpoint::parse("/auth/users/42/metadata", Method::Put).unwrap(),
            Endpoint::UpdateMetadata {
                user_id: "42".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/auth/users/42/apply-teacher", Method::Post).unwrap(),
            Endpoint::ApplyTeacher {
                user_id: "42".to_string()
            }
        );
    }

    #[test]
    fn test_routes_course_endpoints() {
        assert_eq!(
            Endpoint::parse("/courses", Method::Get).unwrap(),
            Endpoint::ListCourses
        );
        assert_eq!(
            Endpoint::parse("/courses/search?q=rust", Method::Get).unwrap(),
            Endpoint::SearchCourses {
                query: "rust".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/courses/category/Data+Science", Method::Get).unwrap(),
            Endpoint::CoursesByCategory {
                category: "Data Science".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/courses/17", Method::Get).unwrap(),
            Endpoint::GetCourse {
                id: "17".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/admin/courses", Method::Post).unwrap(),
            Endpoint::CreateCourse
        );
        assert_eq!(
            Endpoint::parse("/admin/courses/17", Method::Delete).unwrap(),
            Endpoint::DeleteCourse {
                id: "17".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/teacher/courses", Method::Get).unwrap(),
            Endpoint::TeacherCourses
        );
    }

    #[test]
    fn test_search_without_query_param_is_empty() {
        assert_eq!(
            Endpoint::parse("/courses/search", Method::Get).unwrap(),
            Endpoint::SearchCourses {
                query: String::new()
            }
        );
    }

    #[test]
    fn test_unroutable_paths_fail_closed() {
        for (path, method) in [
            ("/admin/users", Method::Get),
            ("/courses", Method::Delete),
            ("/auth/register", Method::Get),
            ("/payments/checkout", Method::Post),
            ("/", Method::Get),
        ] {
            let err = Endpoint::parse(path, method).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Endpoint not implemented: {}", path)
            );
        }
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("patch".parse::<Method>().is_err());
    }
}
