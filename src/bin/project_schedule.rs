//! Print the projected nutrition of one day's schedule
//! Usage: cargo run --bin project_schedule -- [YYYY-MM-DD]

use tracing_subscriber::EnvFilter;

use nutriplan::config;
use nutriplan::db::{migrations, Database};
use nutriplan::models::Schedule;
use nutriplan::nutrition::{project_schedule, schedule_totals};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config::DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let date = match args.get(1) {
        Some(date) => date.clone(),
        None => chrono::Local::now().format("%Y-%m-%d").to_string(),
    };

    let db_path = config::database_path();
    println!("Database: {}", db_path.display());

    let database = Database::new(&db_path)?;
    database.with_conn(migrations::run_migrations)?;

    let conn = database.get_conn()?;
    let schedule = match Schedule::get_by_date(&conn, &date)? {
        Some(schedule) => schedule,
        None => {
            println!("No schedule found for date: {}", date);
            return Ok(());
        }
    };

    let projected = project_schedule(&*conn, &schedule)?;
    let totals = schedule_totals(&projected);

    println!("Schedule for {}", projected.date);

    for meal in &projected.meals {
        if meal.dishes.is_empty() {
            continue;
        }
        println!("\n{}", meal.meal_type.as_str());
        for dish in &meal.dishes {
            let servings = dish
                .scheduled
                .servings
                .map(|s| format!("{:.1} servings", s))
                .unwrap_or_else(|| "default servings".to_string());
            println!(
                "  {} ({}){}: {:.0} kcal",
                dish.scheduled.name,
                servings,
                if dish.scheduled.is_eaten { " [eaten]" } else { "" },
                dish.nutrition.calories()
            );
        }
    }

    println!("\nPlanned: {:.0} kcal", totals.planned.calories());
    println!("Eaten:   {:.0} kcal", totals.eaten.calories());
    for other in &totals.planned_other_units {
        println!("Also planned: {} {:.1} {}", other.nutrient, other.value, other.unit);
    }
    if let (Some(target), Some(remaining)) = (totals.calorie_target, totals.remaining_calories) {
        println!("Target:  {:.0} kcal ({:.0} remaining)", target, remaining);
    }

    Ok(())
}
