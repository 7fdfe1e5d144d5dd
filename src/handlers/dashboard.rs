use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::{Local, Timelike};

use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::attendance::{self, MealType};
use crate::models::{bill, student};
use crate::templates_structs::{DashboardTemplate, PageContext};

fn time_greeting(username: &str) -> String {
    let hour = Local::now().hour();
    let period = match hour {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    };
    format!("{}, {}", period, username)
}

pub async fn index(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/dashboard")?;

    let now = Local::now();
    let today = now.date_naive();

    let greeting = time_greeting(&ctx.username);
    let student_count = student::count_by_mess(&conn, ctx.mess_id)?;
    let (lunch_today, dinner_today) = attendance::today_counts(&conn, ctx.mess_id, today)?;
    let unpaid_bills = bill::count_unpaid_by_mess(&conn, ctx.mess_id)?;
    let current_meal = MealType::for_hour(now.hour()).label();

    let tmpl = DashboardTemplate {
        ctx,
        greeting,
        student_count,
        lunch_today,
        dinner_today,
        unpaid_bills,
        current_meal,
    };
    render(tmpl)
}
