pub mod podcast_listeners;
pub mod podcasts;
