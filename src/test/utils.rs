#[cfg(test)]
pub mod test_db {
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::init_rocket;
    use chrono::{Duration, Utc};
    use rocket::local::asynchronous::Client;
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
    use std::collections::HashMap;

    pub static TEST_WEBHOOK_KEY: &str = "test-webhook-key";
    pub static TEST_PUBLIC_URL: &str = "https://courses.test";

    struct TestCourse {
        slug: String,
        title: String,
        price: i64,
        is_free: bool,
        is_published: bool,
    }

    struct TestModule {
        course_slug: String,
        position: i64,
        title: String,
    }

    struct TestLesson {
        course_slug: String,
        module_position: i64,
        position: i64,
        title: String,
    }

    struct TestEnrollment {
        user_id: i64,
        course_slug: String,
        days_ago: i64,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        courses: Vec<TestCourse>,
        modules: Vec<TestModule>,
        lessons: Vec<TestLesson>,
        enrollments: Vec<TestEnrollment>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn course(
            mut self,
            slug: &str,
            title: &str,
            price: i64,
            is_free: bool,
            is_published: bool,
        ) -> Self {
            self.courses.push(TestCourse {
                slug: slug.to_string(),
                title: title.to_string(),
                price,
                is_free,
                is_published,
            });
            self
        }

        pub fn module(mut self, course_slug: &str, position: i64, title: &str) -> Self {
            self.modules.push(TestModule {
                course_slug: course_slug.to_string(),
                position,
                title: title.to_string(),
            });
            self
        }

        pub fn lesson(
            mut self,
            course_slug: &str,
            module_position: i64,
            position: i64,
            title: &str,
        ) -> Self {
            self.lessons.push(TestLesson {
                course_slug: course_slug.to_string(),
                module_position,
                position,
                title: title.to_string(),
            });
            self
        }

        /// Course with a single module and `lesson_count` lessons, the common
        /// case in these tests.
        pub fn simple_course(
            mut self,
            slug: &str,
            title: &str,
            price: i64,
            is_free: bool,
            lesson_count: i64,
        ) -> Self {
            self = self.course(slug, title, price, is_free, true);
            self = self.module(slug, 1, "Module One");
            for position in 1..=lesson_count {
                self = self.lesson(slug, 1, position, &format!("Lesson {}", position));
            }
            self
        }

        pub fn enrollment(mut self, user_id: i64, course_slug: &str) -> Self {
            self.enrollments.push(TestEnrollment {
                user_id,
                course_slug: course_slug.to_string(),
                days_ago: 0,
            });
            self
        }

        pub fn enrollment_days_ago(mut self, user_id: i64, course_slug: &str, days_ago: i64) -> Self {
            self.enrollments.push(TestEnrollment {
                user_id,
                course_slug: course_slug.to_string(),
                days_ago,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            // One connection so every handle sees the same in-memory database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut course_id_map: HashMap<String, i64> = HashMap::new();
            let mut module_id_map: HashMap<(String, i64), i64> = HashMap::new();

            for course in &self.courses {
                let result = sqlx::query(
                    "INSERT INTO courses (slug, title, price, is_free, is_published)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&course.slug)
                .bind(&course.title)
                .bind(course.price)
                .bind(course.is_free)
                .bind(course.is_published)
                .execute(&pool)
                .await?;

                course_id_map.insert(course.slug.clone(), result.last_insert_rowid());
            }

            for module in &self.modules {
                let course_id = course_id_map[&module.course_slug];
                let result = sqlx::query(
                    "INSERT INTO modules (course_id, position, title) VALUES (?, ?, ?)",
                )
                .bind(course_id)
                .bind(module.position)
                .bind(&module.title)
                .execute(&pool)
                .await?;

                module_id_map.insert(
                    (module.course_slug.clone(), module.position),
                    result.last_insert_rowid(),
                );
            }

            for lesson in &self.lessons {
                let module_id =
                    module_id_map[&(lesson.course_slug.clone(), lesson.module_position)];
                sqlx::query(
                    "INSERT INTO lessons (module_id, position, title) VALUES (?, ?, ?)",
                )
                .bind(module_id)
                .bind(lesson.position)
                .bind(&lesson.title)
                .execute(&pool)
                .await?;
            }

            for enrollment in &self.enrollments {
                let course_id = course_id_map[&enrollment.course_slug];
                let created_at =
                    (Utc::now() - Duration::days(enrollment.days_ago)).naive_utc();
                sqlx::query(
                    "INSERT INTO enrollments (user_id, course_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(enrollment.user_id)
                .bind(course_id)
                .bind(created_at)
                .execute(&pool)
                .await?;
            }

            Ok(TestDb {
                pool,
                course_id_map,
                module_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub course_id_map: HashMap<String, i64>,
        pub module_id_map: HashMap<(String, i64), i64>,
    }

    impl TestDb {
        pub fn course_id(&self, slug: &str) -> i64 {
            self.course_id_map[slug]
        }

        /// Lesson ids for a course in catalog order.
        pub async fn lesson_ids(&self, slug: &str) -> Result<Vec<i64>, sqlx::Error> {
            let course_id = self.course_id(slug);
            let ids = sqlx::query_scalar::<_, i64>(
                "SELECT l.id FROM lessons l
                 JOIN modules m ON m.id = l.module_id
                 WHERE m.course_id = ?
                 ORDER BY m.position, l.position",
            )
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(ids)
        }

        /// Appends a lesson after the fact, for the no-retroactive-snapshot
        /// cases.
        pub async fn add_lesson(
            &self,
            slug: &str,
            module_position: i64,
            position: i64,
            title: &str,
        ) -> Result<i64, sqlx::Error> {
            let module_id = self.module_id_map[&(slug.to_string(), module_position)];
            let result = sqlx::query(
                "INSERT INTO lessons (module_id, position, title) VALUES (?, ?, ?)",
            )
            .bind(module_id)
            .bind(position)
            .bind(title)
            .execute(&self.pool)
            .await?;

            Ok(result.last_insert_rowid())
        }
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let config = AppConfig {
            public_url: TEST_PUBLIC_URL.to_string(),
            payment_webhook_key: TEST_WEBHOOK_KEY.to_string(),
        };

        let rocket = init_rocket(test_db.pool.clone(), config).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build test client");

        (client, test_db)
    }
}
