pub mod database;

pub use database::mongo_client::MongoClient;
