use crate::models::Workout;

/// Read-only listing of the workouts stored for the selected date.
pub(crate) struct SavedWorkoutsScreen {
    pub(crate) workouts: Vec<Workout>,
    pub(crate) selected: usize,
}

impl SavedWorkoutsScreen {
    pub(crate) fn new(workouts: Vec<Workout>) -> Self {
        let mut screen = Self {
            workouts,
            selected: 0,
        };
        screen.ensure_in_bounds();
        screen
    }

    pub(crate) fn set_workouts(&mut self, workouts: Vec<Workout>) {
        self.workouts = workouts;
        self.ensure_in_bounds();
    }

    pub(crate) fn current_workout(&self) -> Option<&Workout> {
        self.workouts.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.workouts.is_empty() {
            return;
        }
        let len = self.workouts.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.workouts.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.workouts.len() {
            self.selected = self.workouts.len() - 1;
        }
    }

    /// Text lines for one workout card: each exercise name, then one line per
    /// set.
    pub(crate) fn card_lines(workout: &Workout) -> Vec<String> {
        if workout.exercises.is_empty() {
            return vec!["(no exercises)".to_string()];
        }
        let mut lines = Vec::new();
        for exercise in &workout.exercises {
            let name = if exercise.name.trim().is_empty() {
                "(unnamed exercise)"
            } else {
                exercise.name.as_str()
            };
            lines.push(name.to_string());
            lines.extend(exercise.sets.iter().map(|set| format!("  {set}")));
        }
        lines
    }
}
