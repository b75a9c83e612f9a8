pub mod app;
pub mod check_url;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod policy;
pub mod repl;
pub mod replay;
pub mod runtime;
