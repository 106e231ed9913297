pub mod gallery_commands;
