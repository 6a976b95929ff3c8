//! Browser automation: session contract, WebDriver client and wait helpers

pub mod error;
pub mod session;
pub mod wait;
pub mod webdriver;

pub use error::{SessionError, SessionResult};
pub use session::{BrowserSession, ElementHandle, Key, Locator, SessionFactory, xpath_literal};
pub use wait::{WaitPolicy, WaitSettings};
pub use webdriver::{WebDriverSession, WebDriverSessionFactory};
