pub mod captcha;
pub use captcha::{Captcha, CaptchaVerifier, ReCaptchaVerifier};

pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod mailer;
pub use mailer::{ConsoleMailer, EmailMessage, MailError, Mailer, MemoryMailer, SmtpMailer};

pub mod token;
pub use token::{TokenGenerator, TokenPurpose};

pub mod blog_service;
pub mod blog_service_impl;
pub use blog_service::{BlogError, BlogService, PostDetail};
pub use blog_service_impl::SeaOrmBlogService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::SeaOrmAuthService;
