pub mod bench;
pub mod board;
pub mod config;
pub mod controller;
pub mod crc;
pub mod error;
pub mod motion;
pub mod motor_loop;
pub mod protocol;
pub mod runtime;
