use std::{
    error,
    net::{TcpStream, ToSocketAddrs},
    path::PathBuf,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{config::API_URL, models::user_model::SlimUser};

/// What `login`/`signup` leave behind for later commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user: SlimUser,
}

/// Checks whether something already listens on `address`
pub fn is_server_running(address: &str) -> bool {
    let addrs = match address.to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(_) => return false,
    };

    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(300)).is_ok())
}

fn credentials_path() -> Result<PathBuf, Box<dyn error::Error>> {
    let mut path = dirs::home_dir().ok_or("Cannot locate home directory")?;
    path.push("todo");
    path.push("credentials");
    Ok(path)
}

/// Get credentials saved by the last login
pub fn load_credentials() -> Result<Credentials, Box<dyn error::Error>> {
    read_credentials(&credentials_path()?)
}

/// Saves `Todo` login credentials at ~/todo/credentials
pub fn save_credentials(credentials: &Credentials) -> Result<(), Box<dyn error::Error>> {
    write_credentials(&credentials_path()?, credentials)
}

/// Forget the stored login; missing file is fine
pub fn clear_credentials() -> Result<(), Box<dyn error::Error>> {
    let path = credentials_path()?;

    if path.exists() {
        std::fs::remove_file(path)?;
    }

    Ok(())
}

fn read_credentials(path: &PathBuf) -> Result<Credentials, Box<dyn error::Error>> {
    let contents = std::fs::read_to_string(path)?;

    Ok(serde_json::from_str(&contents)?)
}

fn write_credentials(
    path: &PathBuf,
    credentials: &Credentials,
) -> Result<(), Box<dyn error::Error>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    std::fs::write(path, serde_json::to_string(credentials)?)?;

    Ok(())
}

pub fn make_api_url(resource: &str) -> String {
    format!(
        "http://{}/api/{}",
        API_URL.as_str(),
        resource.trim_start_matches('/')
    )
}

#[cfg(test)]
mod utils_test {
    use super::*;

    #[test]
    fn test_make_api_url() {
        let api_url = make_api_url("auth/login");

        assert_eq!(
            api_url,
            format!("http://{}/api/auth/login", API_URL.as_str())
        );
        assert_eq!(make_api_url("/todos"), make_api_url("todos"));
    }

    #[test]
    fn test_credentials_round_trip() {
        let mut path = std::env::temp_dir();
        path.push(format!("team-todo-test-{}", uuid::Uuid::new_v4()));
        path.push("credentials");

        let credentials = Credentials {
            token: "randombytesisthe".to_string(),
            user: SlimUser {
                id: uuid::Uuid::new_v4(),
                name: "Ann".into(),
                email: "ann@example.com".into(),
            },
        };

        write_credentials(&path, &credentials).unwrap();
        assert_eq!(read_credentials(&path).unwrap(), credentials);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_nothing_listens_on_unroutable_address() {
        assert!(!is_server_running("not a host"));
    }
}
