mod inspection;
mod leak_detection;
mod listing;
