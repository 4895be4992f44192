mod university_api;

pub use university_api::university_router;
