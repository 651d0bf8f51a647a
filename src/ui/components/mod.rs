pub mod progress_bar;
pub mod quest_list;
pub mod stats_view;
pub mod stopwatch_panel;
pub mod subject_sidebar;
